/// Name of the service loggers; the default handler prints it as the `[ngx-umami]` prefix.
pub const LOGGER_NAME: &str = "ngx-umami";

/// Global slot the tracker script registers itself under.
pub const TRACKER_GLOBAL: &str = "umami";

pub const TRACK_ATTRIBUTE: &str = "data-umami-track";
pub const TRACK_ON_ATTRIBUTE: &str = "data-umami-track-on";
pub const TRACK_DATA_ATTRIBUTE: &str = "data-umami-track-data";
