use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::memory::AddressSpace;

/// Split raw image bytes into little-endian 16-bit words.
pub fn decode_image(bytes: &[u8]) -> Result<Vec<u16>, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::OddLength { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|word| u16::from_le_bytes([word[0], word[1]]))
        .collect())
}

/// Read and decode an image file without placing it in memory.
pub fn read_image(path: impl AsRef<Path>) -> Result<Vec<u16>, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_image(&bytes)
}

/// Read an image file into a fresh address space.
pub fn load_file(path: impl AsRef<Path>) -> Result<AddressSpace, LoadError> {
    let words = read_image(path)?;
    Ok(AddressSpace::from_image(&words)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::memory::MEMORY_SIZE;

    #[test]
    fn words_are_little_endian() {
        let words = decode_image(&[9, 0, 0, 128, 5, 0, 0xFF, 0xFF]).unwrap();
        assert_eq!(words, vec![9, 0x8000, 5, 0xFFFF]);
    }

    #[test]
    fn empty_image() {
        assert_eq!(decode_image(&[]).unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn odd_length_is_rejected() {
        assert!(matches!(
            decode_image(&[1, 0, 2]),
            Err(LoadError::OddLength { len: 3 })
        ));
    }

    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("synvm-loader-test-does-not-exist.bin");
        assert!(matches!(load_file(&path), Err(LoadError::Io { .. })));
    }

    #[test]
    fn oversized_file() {
        let path = std::env::temp_dir().join(format!("synvm-loader-test-{}.bin", std::process::id()));
        fs::write(&path, vec![0u8; (MEMORY_SIZE + 1) * 2]).unwrap();
        let result = load_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(LoadError::Image(FaultKind::ImageTooLarge { words })) if words == MEMORY_SIZE + 1
        ));
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("synvm-loader-ok-{}.bin", std::process::id()));
        fs::write(&path, [19, 0, 65, 0, 0, 0]).unwrap();
        let space = load_file(&path);
        fs::remove_file(&path).unwrap();
        let space = space.unwrap();
        assert_eq!(&space.memory()[..4], &[19, 65, 0, 0]);
    }
}
