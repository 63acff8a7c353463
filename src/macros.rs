/// Trace d'une transition validée (feature `logging`), sinon rien.
macro_rules! audit {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        tracing::info!(target: "shiftboard::audit", $($arg)*);
    }};
}
