use log::SetLoggerError;

/// Attempt to init a env_logger for heapti.
/// Does nothing if the "builtin_env_logger" feature is disabled.
///
/// Unless `RUST_LOG` says otherwise, only messages from heapti at `info` or
/// above are printed, so that a tool embedding heapti is not flooded by the
/// log output of its other dependencies.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "heapti=info"),
            )
        } else {
            Ok(())
        }
    }
}
