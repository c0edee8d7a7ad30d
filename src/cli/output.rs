//! CLI output: error mapping to the CLI surface.

/// Render an error and its causes, outermost first.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("{:#}", e)
}
