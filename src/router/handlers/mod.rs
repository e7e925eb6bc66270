pub mod help;
pub mod join;
pub mod list;
pub mod motd;
pub mod msg;
pub mod nick;
pub mod part;
pub mod quit;
pub mod who;

/// Channel arguments may omit the leading `#`.
pub(crate) fn ensure_channel_prefix(name: &str) -> String {
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}
