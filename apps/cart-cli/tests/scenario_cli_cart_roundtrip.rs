use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;
use tempfile::TempDir;

/// One isolated config + data dir per test.
fn cart(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lucha-cart").expect("binary built");
    cmd.arg("--config")
        .arg(tmp.path().join("cart.toml"))
        .env("LUCHA_CART_DATA_DIR", tmp.path().join("data"))
        .env("LUCHA_CART_SESSION_ID", "test-session")
        .env_remove("LUCHA_CART_STORAGE_MODE")
        .env_remove("LUCHA_CART_KEY")
        .env_remove("LUCHA_CART_DEBOUNCE_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn show_json(tmp: &TempDir) -> Value {
    let out = cart(tmp).args(["--json", "show"]).output().expect("run show");
    assert!(out.status.success(), "show failed: {:?}", out);
    serde_json::from_slice(&out.stdout).expect("summary JSON")
}

#[test]
fn cli_cart_survives_across_invocations() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["add", "--id", "t1", "--name", "California Taco", "--price-cents", "500", "--qty", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("California Taco"))
        .stdout(predicate::str::contains("$10.00"));

    cart(&tmp)
        .args(["add", "--id", "t1", "--price-cents", "500"])
        .assert()
        .success();

    let summary = show_json(&tmp);
    assert_eq!(summary["totalQty"], 3);
    assert_eq!(summary["subtotalCents"], 1500);
    assert_eq!(summary["storageMode"], "local");
    assert_eq!(summary["items"][0]["name"], "California Taco");
}

#[test]
fn cli_text_price_is_exact() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["add", "--id", "a", "--title", "Horchata", "--price", "$9.99", "--qty", "2"])
        .assert()
        .success();

    let summary = show_json(&tmp);
    assert_eq!(summary["subtotalCents"], 1998);
    assert_eq!(summary["items"][0]["name"], "Horchata");
}

#[test]
fn cli_blank_id_is_rejected() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["add", "--id", "", "--price-cents", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("id is required"));

    assert_eq!(show_json(&tmp)["totalQty"], 0);
}

#[test]
fn cli_update_remove_and_clear() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["add", "--id", "t1", "--price-cents", "500", "--qty", "2"])
        .assert()
        .success();
    cart(&tmp)
        .args(["add", "--id", "x", "--price-cents", "250"])
        .assert()
        .success();

    cart(&tmp).args(["update", "t1", "5"]).assert().success();
    cart(&tmp).args(["update", "ghost", "5"]).assert().success();
    assert_eq!(show_json(&tmp)["subtotalCents"], 2750);

    cart(&tmp).args(["remove", "x"]).assert().success();
    assert_eq!(show_json(&tmp)["totalQty"], 5);

    cart(&tmp)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cart is empty"));
}

#[test]
fn cli_mode_switch_moves_cart_and_is_remembered() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["add", "--id", "t1", "--price-cents", "500", "--qty", "2"])
        .assert()
        .success();

    cart(&tmp)
        .args(["mode", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session storage"));

    let config = std::fs::read_to_string(tmp.path().join("cart.toml")).unwrap();
    assert!(config.contains("mode = \"session\""));

    assert!(!tmp
        .path()
        .join("data")
        .join("local")
        .join("lucha_cart_v1.json")
        .exists());

    let summary = show_json(&tmp);
    assert_eq!(summary["storageMode"], "session");
    assert_eq!(summary["totalQty"], 2);
}

#[test]
fn cli_unknown_mode_fails() {
    let tmp = TempDir::new().unwrap();

    cart(&tmp)
        .args(["mode", "cloud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid storage mode"));

    cart(&tmp)
        .args(["mode", "memory"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be selected at runtime"));
}
