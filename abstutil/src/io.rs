use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn write_json<T: Serialize>(path: &str, obj: &T) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs_err::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(obj)?;
    fs_err::write(path, contents)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let contents = fs_err::read_to_string(path)?;
    let obj: T =
        serde_json::from_str(&contents).with_context(|| format!("deserializing {}", path))?;
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn write_then_read() {
        let path = std::env::temp_dir()
            .join("abstutil_io_test")
            .join("thing.json");
        let path = path.to_string_lossy().to_string();

        let mut obj = BTreeMap::new();
        obj.insert("a".to_string(), 3);
        obj.insert("b".to_string(), 5);
        write_json(&path, &obj).unwrap();
        let copy: BTreeMap<String, usize> = read_json(&path).unwrap();
        assert_eq!(obj, copy);
    }

    #[test]
    fn missing_file() {
        assert!(read_json::<Vec<usize>>("/definitely/not/here.json").is_err());
    }
}
