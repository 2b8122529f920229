use crate::error::CoreError;

use super::types::TriggerConfig;

impl TriggerConfig {
    /// Validate the sections that must be sound for the process to start.
    ///
    /// Individual task entries are deliberately not checked here; they are
    /// validated one by one when the engine is built.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.validate_cache_prefix()?;
        self.validate_task_names()?;
        Ok(())
    }

    fn validate_cache_prefix(&self) -> Result<(), CoreError> {
        if self.cache.prefix.trim().is_empty() {
            return Err(CoreError::Config("cache.prefix must not be empty".into()));
        }
        Ok(())
    }

    fn validate_task_names(&self) -> Result<(), CoreError> {
        for name in self.tasks.keys() {
            if name.trim().is_empty() {
                return Err(CoreError::Config("task names must not be empty".into()));
            }
        }
        Ok(())
    }
}
