use super::*;
use std::io::Write;

#[test]
fn daily_appender_writes_prefixed_file() {
    let dir = std::env::temp_dir().join(format!("heva-chat-logs-{}", uuid::Uuid::new_v4()));
    let dir_str = dir.to_str().unwrap().to_string();

    let mut appender = daily_appender(&dir_str).unwrap();
    writeln!(appender, "relay started").unwrap();
    appender.flush().unwrap();

    let files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with(LOG_FILE_PREFIX), "{name}");
    assert!(std::fs::read_to_string(&files[0]).unwrap().contains("relay started"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unwritable_log_dir_is_an_error() {
    let file = std::env::temp_dir().join(format!("heva-chat-not-a-dir-{}", uuid::Uuid::new_v4()));
    std::fs::write(&file, "x").unwrap();
    assert!(daily_appender(file.to_str().unwrap()).is_err());
    std::fs::remove_file(&file).unwrap();
}
