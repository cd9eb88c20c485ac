/// Skip a test if AWS credentials are not configured.
#[macro_export]
macro_rules! skip_without_aws {
    () => {
        if std::env::var("AWS_ACCESS_KEY_ID").is_err() && std::env::var("AWS_PROFILE").is_err() {
            eprintln!("SKIPPED: neither AWS_ACCESS_KEY_ID nor AWS_PROFILE set");
            return;
        }
        if std::env::var("LAUNCHER_TEST_AWS_SECRET").is_err() {
            eprintln!("SKIPPED: LAUNCHER_TEST_AWS_SECRET not set (set to a secret ARN)");
            return;
        }
    };
}
