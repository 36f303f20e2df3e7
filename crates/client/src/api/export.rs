//! Bulk entity export.
//!
//! A report is a snapshot taken when it is opened. Handles are tracked per
//! attachment: fetching from or closing a handle that was never opened, or
//! is already closed, fails locally with [`Error::UnknownExportHandle`].
//!
//! [`ExportReport`] wraps a handle in a guard that iterates chunks and
//! closes the handle exactly once, on exhaustion of the caller's interest
//! or on drop.

use erbind_core::{EngineFlags, Error, ExportHandle, Result};

use super::Resolver;

impl Resolver {
    // =========================================================================
    // Handle API
    // =========================================================================

    /// Open a JSON-lines entity report.
    pub fn export_json_entity_report(&self, flags: EngineFlags) -> Result<ExportHandle> {
        self.with_attachment("export_json_entity_report", |attachment| {
            let handle = attachment.engine.export_json_entity_report(flags)?;
            attachment.open_exports.insert(handle);
            tracing::debug!(target: "erbind::client", %handle, "report opened");
            Ok(handle)
        })
    }

    /// Open a CSV entity report. `column_list` is a comma separated list of
    /// column names; `""` or `"*"` selects the engine's default columns.
    pub fn export_csv_entity_report(&self, column_list: &str, flags: EngineFlags) -> Result<ExportHandle> {
        self.with_attachment("export_csv_entity_report", |attachment| {
            let handle = attachment.engine.export_csv_entity_report(column_list, flags)?;
            attachment.open_exports.insert(handle);
            tracing::debug!(target: "erbind::client", %handle, "report opened");
            Ok(handle)
        })
    }

    /// Next chunk of an open report, or `""` once the report is exhausted.
    pub fn fetch_next(&self, handle: ExportHandle) -> Result<String> {
        self.with_attachment("fetch_next", |attachment| {
            if !attachment.open_exports.contains(&handle) {
                return Err(Error::UnknownExportHandle {
                    handle: handle.as_u64(),
                });
            }
            attachment.engine.fetch_next(handle)
        })
    }

    /// Release a report handle. The handle is invalid afterwards even if
    /// the engine reports a failure.
    pub fn close_export_report(&self, handle: ExportHandle) -> Result<()> {
        self.with_attachment("close_export_report", |attachment| {
            if !attachment.open_exports.remove(&handle) {
                return Err(Error::UnknownExportHandle {
                    handle: handle.as_u64(),
                });
            }
            attachment.engine.close_export_report(handle)
        })
    }

    // =========================================================================
    // Guarded Reports
    // =========================================================================

    /// Open a JSON-lines report wrapped in a closing guard.
    pub fn export_json(&self, flags: EngineFlags) -> Result<ExportReport<'_>> {
        let handle = self.export_json_entity_report(flags)?;
        Ok(ExportReport::new(self, handle))
    }

    /// Open a CSV report wrapped in a closing guard.
    pub fn export_csv(&self, column_list: &str, flags: EngineFlags) -> Result<ExportReport<'_>> {
        let handle = self.export_csv_entity_report(column_list, flags)?;
        Ok(ExportReport::new(self, handle))
    }
}

/// An open report that closes its handle exactly once.
///
/// Iterating yields chunks until the report is exhausted; the handle is
/// closed at that point, by [`ExportReport::close`], or on drop, whichever
/// comes first.
///
/// ```text
/// for chunk in resolver.export_json(EngineFlags::EXPORT_DEFAULT_FLAGS)? {
///     let line = chunk?;
///     println!("{}", line.trim_end());
/// }
/// ```
#[derive(Debug)]
pub struct ExportReport<'a> {
    resolver: &'a Resolver,
    handle: Option<ExportHandle>,
    id: ExportHandle,
}

impl<'a> ExportReport<'a> {
    fn new(resolver: &'a Resolver, handle: ExportHandle) -> Self {
        Self {
            resolver,
            handle: Some(handle),
            id: handle,
        }
    }

    /// The underlying handle.
    pub fn handle(&self) -> ExportHandle {
        self.id
    }

    /// True until the handle has been closed.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Read every remaining chunk and close the report.
    pub fn read_to_string(mut self) -> Result<String> {
        let mut out = String::new();
        for chunk in self.by_ref() {
            out.push_str(&chunk?);
        }
        self.close()?;
        Ok(out)
    }

    /// Close the handle now. Closing an already closed report is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => self.resolver.close_export_report(handle),
            None => Ok(()),
        }
    }
}

impl Iterator for ExportReport<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handle?;
        match self.resolver.fetch_next(handle) {
            Ok(chunk) if chunk.is_empty() => match self.close() {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            },
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                // A failed fetch ends iteration; the handle is still released.
                if let Err(close_err) = self.close() {
                    tracing::warn!(target: "erbind::client", error = %close_err, "report close failed");
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for ExportReport<'_> {
    fn drop(&mut self) {
        // The resolver may already be destroyed, which invalidates the handle.
        if self.handle.is_some() && !self.resolver.is_attached() {
            self.handle = None;
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(target: "erbind::client", handle = %self.id, error = %e, "report close on drop failed");
        }
    }
}
