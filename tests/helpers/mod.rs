#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use qbank::bank::{Question, QuestionBank};
use tempfile::TempDir;

/// Write a solid-colour RGB image to `dir/{name}.{ext}`.
pub fn write_image(dir: &Path, name: &str, ext: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{name}.{ext}"));
    RgbImage::from_pixel(width, height, Rgb([200, 40, 40])).save(&path).unwrap();
    path
}

/// Write a half-transparent RGBA PNG to `dir/{name}.png`.
pub fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{name}.png"));
    RgbaImage::from_pixel(width, height, Rgba([10, 200, 10, 128])).save(&path).unwrap();
    path
}

pub fn question(qid: &str, img: Option<PathBuf>) -> Question {
    Question::new(qid, format!("What does sign {qid} mean?"), ["Stop", "Go", "Yield"], "Stop", img).unwrap()
}

/// Chapters {1: "Signs", 2: "Rules"}; q1 (ch. 1, text), q2 (ch. 1, image q2.jpg
/// in `img_dir`), q3 (ch. 2, text).
pub fn sample_bank(img_dir: &Path) -> QuestionBank {
    let img = write_image(img_dir, "q2", "jpg", 64, 48);

    let mut bank = QuestionBank::new(img_dir).unwrap();
    bank.add_chapter(1, "Signs").unwrap();
    bank.add_chapter(2, "Rules").unwrap();
    bank.add_question(question("q1", None), 1).unwrap();

    let mut q2 = question("q2", Some(img));
    q2.set_tags(["signs", "prohibition"]).unwrap();
    q2.set_keywords(["red circle"]).unwrap();
    bank.add_question(q2, 1).unwrap();

    bank.add_question(question("q3", None), 2).unwrap();
    bank
}

/// A temp dir with `images/` created inside.
pub fn workspace() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let img_dir = tmp.path().join("images");
    std::fs::create_dir_all(&img_dir).unwrap();
    (tmp, img_dir)
}
