pub mod archive;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod index;
pub mod install;
pub mod platform;
pub mod product;
pub mod resolve;
pub mod runtime;
pub mod version;

/// Test utilities for cross-platform path handling.
#[cfg(test)]
pub mod test_utils {
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;

    /// Returns a test home directory path based on the platform.
    /// - Unix: `/home/user`
    /// - Windows: `C:\Users\user`
    pub fn test_home() -> PathBuf {
        #[cfg(not(windows))]
        {
            PathBuf::from("/home/user")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\Users\user")
        }
    }

    /// Returns a test temp directory path based on the platform.
    pub fn test_temp() -> PathBuf {
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\Temp")
        }
    }

    /// Configure a mock runtime with common defaults for tests.
    /// - home dir set to [`test_home`]
    /// - temp dir set to [`test_temp`]
    /// - every environment variable absent
    /// - current_dir set to [`test_home`]
    pub fn configure_mock_runtime_basics(runtime: &mut MockRuntime) {
        runtime.expect_home_dir().returning(|| Some(test_home()));
        runtime.expect_temp_dir().returning(test_temp);

        runtime
            .expect_env_var()
            .returning(|_| Err(std::env::VarError::NotPresent));

        runtime.expect_current_dir().returning(|| Ok(test_home()));
    }
}
