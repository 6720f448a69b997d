use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use wordfreq::chunk::plan;
use wordfreq::tokenizer::normalize;
use wordfreq::{
    DirStore, ErrorKind, FrequencyTable, JobConfig, LocalFileSource, Scheduler,
};

const VOCABULARY: &[&str] = &[
    "The", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "Rust", "map",
    "reduce", "2024", "naïve", "café", "x", "und", "東京",
];
const SEPARATORS: &[&str] = &[" ", "  ", ", ", ". ", "!\n", "\t", "--", "\"", "'s "];

fn random_corpus(rng: &mut StdRng, words: usize) -> String {
    let mut text = String::new();
    for _ in 0..words {
        text.push_str(VOCABULARY.choose(rng).unwrap());
        text.push_str(SEPARATORS.choose(rng).unwrap());
    }
    text
}

fn write_input(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("file.txt");
    fs::write(&path, contents).unwrap();
    path
}

fn dir_scheduler(dir: &Path, chunk_size: u64) -> Scheduler<LocalFileSource, DirStore> {
    let config = JobConfig::default().with_chunk_size(chunk_size).with_workers(4);
    let store = DirStore::open(dir.join("intermediate")).unwrap();
    Scheduler::new(config, LocalFileSource, store)
}

/// Counts each chunk on its own, one after another.
fn sequential_partitions(contents: &[u8], chunk_size: u64) -> Vec<FrequencyTable> {
    plan(contents.len() as u64, chunk_size)
        .unwrap()
        .iter()
        .map(|chunk| {
            let range = chunk.offset() as usize..chunk.end() as usize;
            normalize(&contents[range]).into_iter().collect()
        })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_on_disk() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "The cat sat. The dog sat!");
    let scheduler = dir_scheduler(dir.path(), 1024);

    let result = scheduler.run(&input).await.unwrap();

    let out_path = dir.path().join("result.txt");
    result.write_to(fs::File::create(&out_path).unwrap()).unwrap();
    assert_eq!(
        fs::read_to_string(out_path).unwrap(),
        "cat:1\ndog:1\nsat:2\nthe:2\n"
    );
    assert!(scheduler.store().record_path(0).exists());
    assert!(!scheduler.store().record_path(1).exists());
}

#[tokio::test]
async fn test_random_corpus_conserves_counts() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let dir = TempDir::new().unwrap();
        let text = random_corpus(&mut rng, 400);
        let input = write_input(&dir, &text);
        let chunk_size = rng.gen_range(1..300);

        let result = dir_scheduler(dir.path(), chunk_size)
            .run(&input)
            .await
            .unwrap();

        let partitions = sequential_partitions(text.as_bytes(), chunk_size);
        let mut expected = FrequencyTable::new();
        for table in partitions {
            expected.merge(table);
        }
        assert_eq!(result.len(), expected.len());
        for (word, count) in result.entries() {
            assert_eq!(*count, expected.get(word), "count of {word:?}");
        }

        let words: Vec<&[u8]> = result.entries().iter().map(|(w, _)| w.as_bytes()).collect();
        assert!(words.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[tokio::test]
async fn test_same_input_same_output() {
    let mut rng = StdRng::seed_from_u64(42);
    let text = random_corpus(&mut rng, 2000);

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, &text);
        let result = dir_scheduler(dir.path(), 128).run(&input).await.unwrap();
        let mut out = Vec::new();
        result.write_to(&mut out).unwrap();
        outputs.push(out);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "");
    let result = dir_scheduler(dir.path(), 16).run(&input).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_deleted_record_aborts_reduce() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "abc def ghi jkl ");
    let scheduler = dir_scheduler(dir.path(), 4);

    let chunks = scheduler.prepare(&input).unwrap();
    assert_eq!(chunks.len(), 4);
    scheduler.map_phase(&input, &chunks).await.unwrap();
    fs::remove_file(dir.path().join("intermediate/mrtmp.-2.json")).unwrap();

    let err = scheduler.reduce_phase(chunks.len()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(err.index(), Some(2));
}

#[tokio::test]
async fn test_corrupt_record_aborts_reduce() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "abc def ghi jkl ");
    let scheduler = dir_scheduler(dir.path(), 8);

    let chunks = scheduler.prepare(&input).unwrap();
    scheduler.map_phase(&input, &chunks).await.unwrap();
    fs::write(scheduler.store().record_path(1), "{\"ghi\": \"one\"}").unwrap();

    let err = scheduler.reduce_phase(chunks.len()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(err.index(), Some(1));
}

#[tokio::test]
async fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let err = dir_scheduler(dir.path(), 16)
        .run(dir.path().join("absent.txt"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_input_file() {
    use std::os::unix::fs::PermissionsExt;

    for contents in ["some words here", ""] {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, contents);
        fs::set_permissions(&input, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::File::open(&input).is_ok() {
            // permission bits are not enforced for this user (root)
            return;
        }

        let scheduler = dir_scheduler(dir.path(), 4);
        let err = scheduler.run(&input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!scheduler.store().record_path(0).exists());
    }
}

#[tokio::test]
async fn test_run_with_memory_store() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "wordword");
    let config = JobConfig::default().with_chunk_size(4);

    let result = wordfreq::run(config, &input).await.unwrap();
    assert_eq!(result.to_string(), "word:2\n");
}
