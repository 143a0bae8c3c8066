/// Default OS name of the trace thread.
pub const DEFAULT_TRACE_THREAD_NAME: &str = "stepwise-trace";

/// Configuration of a debug session.
#[derive(Clone, Debug, PartialEq, knus::Decode)]
pub struct SessionConfig {
    /// OS name given to the trace thread.
    #[knus(child, default = DEFAULT_TRACE_THREAD_NAME.to_owned(), unwrap(argument))]
    pub trace_thread_name: String,

    /// Whether memory is transferred in bulk (when possible) rather than word
    /// by word.
    #[knus(child, default = true, unwrap(argument))]
    pub bulk_memory: bool,
}

impl SessionConfig {
    /// Parses a configuration from a KDL document.
    pub fn from_kdl(file_name: &str, text: &str) -> Result<Self, knus::Error> {
        knus::parse(file_name, text)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            trace_thread_name: DEFAULT_TRACE_THREAD_NAME.to_owned(),
            bulk_memory: true,
        }
    }
}
