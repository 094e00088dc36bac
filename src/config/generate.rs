pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# HOSTWATCH CONFIGURATION
# =============================================================================
# Every key is optional; omitted keys fall back to the values shown here.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/hostwatch/config.yml
#   3. /etc/hostwatch/config.yml
#
# Environment variables can be referenced as $env{VAR_NAME}.

# =============================================================================
# MONITOR
# =============================================================================
# Settings used by `hostwatch monitor` while tailing a growing log file.

monitor:
  # How long to wait before re-checking the file once all written lines are read
  poll_interval: 5s
  # How often a rolling report is produced
  report_interval: 1h
  # Trailing window each report covers (must not exceed retention)
  report_window: 1h
  # Records older than this are evicted before every report
  retention: 2h
  # Where to start reading: 'beginning' or 'end'
  start: beginning
  # Consecutive read failures tolerated before the monitor stops
  max_read_retries: 5

# =============================================================================
# OUTPUT
# =============================================================================

output:
  # 'text' or 'json'
  format: text
"#
    .to_string()
}
