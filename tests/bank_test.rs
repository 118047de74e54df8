mod helpers;

use std::collections::BTreeSet;

use helpers::{question, sample_bank, workspace};
use qbank::bank::{BankError, Question};

#[test]
fn sample_bank_counts() {
    let (_tmp, img_dir) = workspace();
    let bank = sample_bank(&img_dir);

    assert_eq!(bank.question_count(None).unwrap(), 3);
    assert_eq!(bank.question_count(Some(1)).unwrap(), 2);
    assert_eq!(
        bank.get_qids_by_chapter(2).unwrap(),
        BTreeSet::from(["q3".to_string()])
    );
    assert_eq!(bank.list_chapters(), vec![1, 2]);
    assert!(bank.get_question("q2").unwrap().has_img());
    bank.check_invariants().unwrap();
}

#[test]
fn unknown_chapter_leaves_bank_unchanged() {
    let (_tmp, img_dir) = workspace();
    let mut bank = sample_bank(&img_dir);

    let err = bank.add_question(question("q9", None), 5).unwrap_err();
    assert!(matches!(err, BankError::ChapterNotFound(5)));
    assert_eq!(bank.question_count(None).unwrap(), 3);
    for chapter in bank.list_chapters() {
        assert!(!bank.get_qids_by_chapter(chapter).unwrap().contains("q9"));
    }
}

#[test]
fn every_question_stays_in_exactly_one_chapter() {
    let (_tmp, img_dir) = workspace();
    let mut bank = sample_bank(&img_dir);
    bank.add_chapter(3, "Parking").unwrap();

    // shuffle questions around, including repeated moves of the same qid
    for (qid, chapter) in [("q1", 2), ("q3", 3), ("q1", 3), ("q2", 2), ("q1", 1)] {
        bank.add_question(question(qid, None), chapter).unwrap();
        bank.check_invariants().unwrap();
    }

    let total: usize = bank
        .list_chapters()
        .into_iter()
        .map(|c| bank.question_count(Some(c)).unwrap())
        .sum();
    assert_eq!(total, bank.question_count(None).unwrap());
    assert_eq!(bank.get_question("q1").unwrap().chapter().unwrap().number, 1);
}

#[test]
fn single_answer_question_is_rejected() {
    let err = Question::new("q1", "x?", ["a"], "a", None).unwrap_err();
    assert!(matches!(err, BankError::IncorrectFormat { .. }));
}

#[test]
fn failed_mutation_keeps_correct_answer_invariant() {
    let (_tmp, img_dir) = workspace();
    let mut bank = sample_bank(&img_dir);

    assert!(bank.set_question_labels("q2", ["ok", " "], ["red circle"]).is_err());
    let q = bank.get_question("q2").unwrap();
    assert_eq!(q.tags(), ["signs", "prohibition"]);
    assert_eq!(q.keywords(), ["red circle"]);
    assert!(q.answers().contains(q.correct_answer()));
}
