//! Named worker threads.

use std::thread::{self, JoinHandle};

use crate::constants::APP_ID;

/// Spawns a thread named `terrapaper-<name>`.
///
/// Spawn failures are logged and reported as `None`; nothing in the app
/// treats a missing background thread as fatal.
pub fn spawn_named_thread<F>(name: &str, task: F) -> Option<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("{APP_ID}-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawned_thread_is_named() {
        let handle = spawn_named_thread("probe", || {
            let name = thread::current().name().map(str::to_string);
            assert_eq!(name.as_deref(), Some("terrapaper-probe"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
