/// Returns whether a thread is stopped, according to `/proc`.
pub async fn thread_is_stopped(process_id: u64, thread_id: u64) -> std::io::Result<bool> {
    let stat = tokio::fs::read_to_string(format!("/proc/{process_id}/task/{thread_id}/stat"))
        .await
        .inspect_err(|e| tracing::error!(error = %e, thread_id, "read thread stat"))?;

    Ok(matches!(stat_state(&stat), Some('t' | 'T')))
}

/// Parses the state field of a `stat` file.
fn stat_state(stat: &str) -> Option<char> {
    // the command name may contain parentheses
    let (_, fields) = stat.rsplit_once(')')?;

    fields.trim_start().chars().next()
}
