use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

use crate::core::domain::TestStatus;

const CHUNK_SIZE: usize = 8 * 1024;

/// Compares two files byte for byte. No whitespace or line-ending
/// normalization is done: `"4"` does not match `"4\n"`.
pub async fn compare(expected: &Path, actual: &Path) -> std::io::Result<TestStatus> {
    let expected = File::open(expected).await?;
    let actual = File::open(actual).await?;

    if expected.metadata().await?.len() != actual.metadata().await?.len() {
        return Ok(TestStatus::WrongAnswer);
    }

    let mut expected = BufReader::new(expected);
    let mut actual = BufReader::new(actual);
    let mut expected_buf = vec![0u8; CHUNK_SIZE];
    let mut actual_buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = read_full(&mut expected, &mut expected_buf).await?;
        let m = read_full(&mut actual, &mut actual_buf).await?;
        if expected_buf[..n] != actual_buf[..m] {
            return Ok(TestStatus::WrongAnswer);
        }
        if n == 0 {
            return Ok(TestStatus::Passed);
        }
    }
}

/// Fills `buf` unless EOF comes first, so chunk boundaries line up on both sides.
async fn read_full<R: AsyncReadExt + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::fs;
    use uuid::Uuid;

    async fn write_pair(expected: &[u8], actual: &[u8]) -> (PathBuf, PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("codejudge_cmp_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let expected_path = dir.join("expected.txt");
        let actual_path = dir.join("actual.txt");
        fs::write(&expected_path, expected).await.unwrap();
        fs::write(&actual_path, actual).await.unwrap();
        (dir, expected_path, actual_path)
    }

    #[tokio::test]
    async fn test_identical_output_passes() {
        let (dir, expected, actual) = write_pair(b"4\n", b"4\n").await;
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::Passed);
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_trailing_newline_is_wrong() {
        let (dir, expected, actual) = write_pair(b"4\n", b"4").await;
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::WrongAnswer);
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_line_endings_are_not_normalized() {
        let (dir, expected, actual) = write_pair(b"1\n2\n", b"1\r\n2\r\n").await;
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::WrongAnswer);
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_length_difference_past_first_chunk() {
        let expected_bytes = vec![b'a'; CHUNK_SIZE * 3];
        let mut actual_bytes = expected_bytes.clone();
        actual_bytes[CHUNK_SIZE * 2 + 17] = b'b';

        let (dir, expected, actual) = write_pair(&expected_bytes, &actual_bytes).await;
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::WrongAnswer);

        fs::write(&actual, &expected_bytes).await.unwrap();
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::Passed);
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_files_match() {
        let (dir, expected, actual) = write_pair(b"", b"").await;
        assert_eq!(compare(&expected, &actual).await.unwrap(), TestStatus::Passed);
        fs::remove_dir_all(dir).await.unwrap();
    }
}
