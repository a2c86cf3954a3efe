use flexi_logger::{DeferredNow, style};
use log::Record;

/// `LEVEL message`, colored by level; the module path is added at debug and below.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    if level <= log::Level::Info {
        write!(
            w,
            "{} {}",
            style(level).paint(level.to_string()),
            record.args()
        )
    } else {
        write!(
            w,
            "{} [{}] {}",
            style(level).paint(level.to_string()),
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        )
    }
}
