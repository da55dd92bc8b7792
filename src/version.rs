use chrono::{DateTime, Local};

fn build_time(format: &str) -> String {
    let build_timestamp: i64 = env!("BUILD_TIME").parse().unwrap_or(0);
    let build_datetime: DateTime<Local> = DateTime::from_timestamp(build_timestamp, 0)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now);
    build_datetime.format(format).to_string()
}

pub fn get_version_info() -> &'static str {
    let version = env!("CARGO_PKG_VERSION");
    let git_commit = env!("GIT_COMMIT_HASH");
    let git_branch = env!("GIT_BRANCH");
    let git_dirty = env!("GIT_DIRTY");

    Box::leak(
        format!(
            "{}\n\
         Build Time: {}\n\
         Git Commit: {}\n\
         Git Branch: {}\n\
         Git Status: {}",
            version,
            build_time("%Y-%m-%d %H:%M:%S %Z"),
            git_commit,
            git_branch,
            git_dirty
        )
        .into_boxed_str(),
    )
}

/// Value for the `User-Agent` header of outgoing SUBSCRIBEs.
pub fn get_useragent() -> String {
    format!(
        "rustblf/{} (built {})",
        env!("CARGO_PKG_VERSION"),
        build_time("%Y-%m-%d")
    )
}
