/// Print messages from the `log` crate, filtered at `info` unless `RUST_LOG` says otherwise. Safe
/// to call from every test.
pub fn setup_for_tests() {
    use env_logger::{Builder, Env};
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}
