//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic: link creation and
//! removal, in-use probing, attribute checks and secure file writes.

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    create_symlink, is_locked_by_other, is_system_item, make_writable, open_log_file_secure_append,
    remove_symlink, write_private_file_new,
};

#[cfg(not(unix))]
pub use windows::{
    create_symlink, is_locked_by_other, is_system_item, make_writable, open_log_file_secure_append,
    remove_symlink, write_private_file_new,
};
