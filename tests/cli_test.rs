use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::io::Write;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// deterministic key file with one key per line, no duplicates
fn write_keys(dir: &std::path::Path,count: usize) -> Result<std::path::PathBuf,Box<dyn std::error::Error>> {
    let path = dir.join("keys.txt");
    let mut file = std::fs::File::create(&path)?;
    for i in 0..count {
        writeln!(file,"key{:06}",i * 37)?;
    }
    Ok(path)
}

fn load_and_query(variant: &str) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let key_path = write_keys(temp_dir.path(),1000)?;
    let mut cmd = Command::cargo_bin("pdtrie")?;
    cmd.arg("-d").arg(variant)
        .arg("-k").arg(&key_path)
        .arg("-q").arg("=")
        .arg("-n").arg("1000")
        .assert()
        .success()
        .stdout(predicate::str::contains(" - ok:\t1000"))
        .stdout(predicate::str::contains(" - ng:\t0"))
        .stdout(predicate::str::contains(" - num_keys:\t1000"));
    Ok(())
}

#[test]
fn plain_load_and_query() -> STDRESULT {
    load_and_query("1")
}

#[test]
fn bitmap8_load_and_query() -> STDRESULT {
    load_and_query("2")
}

#[test]
fn bitmap16_load_and_query() -> STDRESULT {
    load_and_query("3")
}

#[test]
fn bitmap32_load_and_query() -> STDRESULT {
    load_and_query("4")
}

#[test]
fn bitmap64_load_and_query() -> STDRESULT {
    load_and_query("5")
}

#[test]
fn skip_queries() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let key_path = write_keys(temp_dir.path(),100)?;
    let mut cmd = Command::cargo_bin("pdtrie")?;
    cmd.arg("-d").arg("1")
        .arg("-k").arg(&key_path)
        .arg("-q").arg("-")
        .arg("-n").arg("100")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench: run_insert"))
        .stdout(predicate::str::contains("Bench: run_search").not());
    Ok(())
}

#[test]
fn bad_fixed_len_exits_one() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let key_path = write_keys(temp_dir.path(),10)?;
    let mut cmd = Command::cargo_bin("pdtrie")?;
    cmd.arg("-d").arg("1")
        .arg("-k").arg(&key_path)
        .arg("-q").arg("-")
        .arg("-n").arg("10")
        .arg("-f").arg("33")
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[test]
fn undersized_table_exits_one() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let key_path = write_keys(temp_dir.path(),1000)?;
    let mut cmd = Command::cargo_bin("pdtrie")?;
    cmd.arg("-d").arg("1")
        .arg("-k").arg(&key_path)
        .arg("-q").arg("-")
        .arg("-n").arg("10")
        .assert()
        .failure()
        .code(1);
    Ok(())
}
