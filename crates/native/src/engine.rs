//! `NativeEngine`: the [`Engine`] implementation backed by the C API.
//!
//! Each method converts its arguments to C strings, issues one native call,
//! and converts the result. A non-zero return code is turned into
//! [`Error::Engine`] from the engine's last-exception state. Returned
//! strings are owned by a guard that releases them through `ErEngine_free`
//! on every exit path.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Arc;

use erbind_core::{
    Component, ConfigId, Engine, EngineFlags, EntityId, Error, ExportHandle, Result,
};

use crate::ffi::{EngineApi, HandleResult, I64Result, ReturnCode, StringResult};

/// Size of the buffer used to read the engine's last exception message.
const EXCEPTION_BUFFER_SIZE: usize = 4096;

/// Config id sent for "use the engine default".
const DEFAULT_CONFIG_ID: ConfigId = 0;

/// An engine-owned response string, freed on drop.
struct NativeString<'a> {
    ptr: *mut c_char,
    api: &'a EngineApi,
}

impl NativeString<'_> {
    fn to_owned_string(&self) -> String {
        if self.ptr.is_null() {
            return String::new();
        }
        // SAFETY: the engine returns NUL-terminated strings that stay valid
        // until released with ErEngine_free.
        unsafe { CStr::from_ptr(self.ptr) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: ptr came from the engine and has not been freed.
            unsafe { (self.api.free)(self.ptr) };
        }
    }
}

fn c_arg(value: &str, name: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| Error::invalid_input(format!("{} contains a NUL byte", name)))
}

/// Engine attachment through the native library.
///
/// The C API keeps process-global state: two `NativeEngine` values loaded
/// from the same library share one engine, and the engine decides whether a
/// second `initialize` is allowed.
pub struct NativeEngine {
    api: Arc<EngineApi>,
}

impl NativeEngine {
    /// Load the engine library at `path`, or the platform default name
    /// resolved through the dynamic linker search path.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let api = EngineApi::load(path)?;
        Ok(Self { api })
    }

    /// Read and clear the engine's last exception.
    fn last_error(&self, component: Component, return_code: ReturnCode) -> Error {
        let mut buf = vec![0 as c_char; EXCEPTION_BUFFER_SIZE];
        // SAFETY: buf is writable for EXCEPTION_BUFFER_SIZE bytes; the engine
        // writes at most len bytes including the terminating NUL.
        let message = unsafe {
            (self.api.get_last_exception)(buf.as_mut_ptr(), buf.len());
            buf[EXCEPTION_BUFFER_SIZE - 1] = 0;
            CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
        };
        // SAFETY: plain calls without arguments.
        let code = unsafe { (self.api.get_last_exception_code)() };
        unsafe { (self.api.clear_last_exception)() };

        let code = if code != 0 { code } else { return_code };
        tracing::warn!(%component, code, %message, "engine call failed");
        Error::engine(component, code, message)
    }

    fn check(&self, component: Component, return_code: ReturnCode) -> Result<()> {
        if return_code == 0 {
            Ok(())
        } else {
            Err(self.last_error(component, return_code))
        }
    }

    fn take_string(&self, component: Component, result: StringResult) -> Result<String> {
        let owned = NativeString {
            ptr: result.response,
            api: &self.api,
        };
        if result.return_code != 0 {
            return Err(self.last_error(component, result.return_code));
        }
        Ok(owned.to_owned_string())
    }

    fn take_i64(&self, component: Component, result: I64Result) -> Result<i64> {
        self.check(component, result.return_code)?;
        Ok(result.response)
    }

    fn take_handle(&self, result: HandleResult) -> Result<ExportHandle> {
        self.check(Component::Engine, result.return_code)?;
        export_handle(result.response)
    }

    fn handle_arg(handle: ExportHandle) -> Result<usize> {
        usize::try_from(handle.as_u64())
            .map_err(|_| Error::UnknownExportHandle {
                handle: handle.as_u64(),
            })
    }
}

/// Opened reports always carry a positive handle.
fn export_handle(response: usize) -> Result<ExportHandle> {
    if response == 0 {
        return Err(Error::InvalidInput {
            reason: "engine returned export handle 0".to_string(),
        });
    }
    Ok(ExportHandle(response as u64))
}

fn flag_arg(flags: EngineFlags) -> i64 {
    flags.bits() as i64
}

impl Engine for NativeEngine {
    fn initialize(
        &mut self,
        instance_name: &str,
        settings: &str,
        config_id: Option<ConfigId>,
        verbose_logging: bool,
    ) -> Result<()> {
        let name = c_arg(instance_name, "instance name")?;
        let settings = c_arg(settings, "settings")?;
        let config_id = config_id.unwrap_or(DEFAULT_CONFIG_ID);
        let rc = unsafe {
            (self.api.initialize)(
                name.as_ptr(),
                settings.as_ptr(),
                config_id,
                i64::from(verbose_logging),
            )
        };
        self.check(Component::Engine, rc)
    }

    fn reinitialize(&mut self, config_id: ConfigId) -> Result<()> {
        let rc = unsafe { (self.api.reinitialize)(config_id) };
        self.check(Component::Engine, rc)
    }

    fn prime(&mut self) -> Result<()> {
        let rc = unsafe { (self.api.prime_engine)() };
        self.check(Component::Engine, rc)
    }

    fn get_active_config_id(&mut self) -> Result<ConfigId> {
        let result = unsafe { (self.api.get_active_config_id)() };
        self.take_i64(Component::Engine, result)
    }

    fn destroy(&mut self) -> Result<()> {
        let rc = unsafe { (self.api.destroy)() };
        self.check(Component::Engine, rc)
    }

    fn add_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        record_definition: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let def = c_arg(record_definition, "record definition")?;
        let result =
            unsafe { (self.api.add_record)(ds.as_ptr(), id.as_ptr(), def.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn delete_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let result = unsafe { (self.api.delete_record)(ds.as_ptr(), id.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn reevaluate_record(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let result =
            unsafe { (self.api.reevaluate_record)(ds.as_ptr(), id.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn reevaluate_entity(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        let result = unsafe { (self.api.reevaluate_entity)(entity_id, flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn process_redo_record(&mut self, redo_record: &str, flags: EngineFlags) -> Result<String> {
        let redo = c_arg(redo_record, "redo record")?;
        let result = unsafe { (self.api.process_redo_record)(redo.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_redo_record(&mut self) -> Result<String> {
        let result = unsafe { (self.api.get_redo_record)() };
        self.take_string(Component::Engine, result)
    }

    fn count_redo_records(&mut self) -> Result<i64> {
        let result = unsafe { (self.api.count_redo_records)() };
        self.take_i64(Component::Engine, result)
    }

    fn get_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        let result = unsafe { (self.api.get_entity_by_entity_id)(entity_id, flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_entity_by_record_id(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let result =
            unsafe { (self.api.get_entity_by_record_id)(ds.as_ptr(), id.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_virtual_entity_by_record_id(
        &mut self,
        record_list: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let list = c_arg(record_list, "record list")?;
        let result =
            unsafe { (self.api.get_virtual_entity_by_record_id)(list.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_record(&mut self, data_source: &str, record_id: &str, flags: EngineFlags) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let result = unsafe { (self.api.get_record)(ds.as_ptr(), id.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_record_preview(&mut self, record_definition: &str, flags: EngineFlags) -> Result<String> {
        let def = c_arg(record_definition, "record definition")?;
        let result = unsafe { (self.api.get_record_preview)(def.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn get_stats(&mut self) -> Result<String> {
        let result = unsafe { (self.api.get_stats)() };
        self.take_string(Component::Engine, result)
    }

    fn find_path_by_entity_id(
        &mut self,
        start_entity_id: EntityId,
        end_entity_id: EntityId,
        max_degrees: i64,
        avoid_entity_ids: &str,
        required_data_sources: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let avoid = c_arg(avoid_entity_ids, "avoid list")?;
        let required = c_arg(required_data_sources, "required data sources")?;
        let result = unsafe {
            (self.api.find_path_by_entity_id)(
                start_entity_id,
                end_entity_id,
                max_degrees,
                avoid.as_ptr(),
                required.as_ptr(),
                flag_arg(flags),
            )
        };
        self.take_string(Component::Engine, result)
    }

    fn find_path_by_record_id(
        &mut self,
        start_data_source: &str,
        start_record_id: &str,
        end_data_source: &str,
        end_record_id: &str,
        max_degrees: i64,
        avoid_record_keys: &str,
        required_data_sources: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let start_ds = c_arg(start_data_source, "start data source")?;
        let start_id = c_arg(start_record_id, "start record id")?;
        let end_ds = c_arg(end_data_source, "end data source")?;
        let end_id = c_arg(end_record_id, "end record id")?;
        let avoid = c_arg(avoid_record_keys, "avoid list")?;
        let required = c_arg(required_data_sources, "required data sources")?;
        let result = unsafe {
            (self.api.find_path_by_record_id)(
                start_ds.as_ptr(),
                start_id.as_ptr(),
                end_ds.as_ptr(),
                end_id.as_ptr(),
                max_degrees,
                avoid.as_ptr(),
                required.as_ptr(),
                flag_arg(flags),
            )
        };
        self.take_string(Component::Engine, result)
    }

    fn find_network_by_entity_id(
        &mut self,
        entity_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        let list = c_arg(entity_list, "entity list")?;
        let result = unsafe {
            (self.api.find_network_by_entity_id)(
                list.as_ptr(),
                max_degrees,
                build_out_degrees,
                max_entities,
                flag_arg(flags),
            )
        };
        self.take_string(Component::Engine, result)
    }

    fn find_network_by_record_id(
        &mut self,
        record_list: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        max_entities: i64,
        flags: EngineFlags,
    ) -> Result<String> {
        let list = c_arg(record_list, "record list")?;
        let result = unsafe {
            (self.api.find_network_by_record_id)(
                list.as_ptr(),
                max_degrees,
                build_out_degrees,
                max_entities,
                flag_arg(flags),
            )
        };
        self.take_string(Component::Engine, result)
    }

    fn search_by_attributes(
        &mut self,
        attributes: &str,
        search_profile: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let attrs = c_arg(attributes, "attributes")?;
        let profile = c_arg(search_profile, "search profile")?;
        let result = unsafe {
            (self.api.search_by_attributes)(attrs.as_ptr(), profile.as_ptr(), flag_arg(flags))
        };
        self.take_string(Component::Engine, result)
    }

    fn why_entities(
        &mut self,
        entity_id_1: EntityId,
        entity_id_2: EntityId,
        flags: EngineFlags,
    ) -> Result<String> {
        let result = unsafe { (self.api.why_entities)(entity_id_1, entity_id_2, flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn why_records(
        &mut self,
        data_source_1: &str,
        record_id_1: &str,
        data_source_2: &str,
        record_id_2: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds1 = c_arg(data_source_1, "data source")?;
        let id1 = c_arg(record_id_1, "record id")?;
        let ds2 = c_arg(data_source_2, "data source")?;
        let id2 = c_arg(record_id_2, "record id")?;
        let result = unsafe {
            (self.api.why_records)(
                ds1.as_ptr(),
                id1.as_ptr(),
                ds2.as_ptr(),
                id2.as_ptr(),
                flag_arg(flags),
            )
        };
        self.take_string(Component::Engine, result)
    }

    fn why_record_in_entity(
        &mut self,
        data_source: &str,
        record_id: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let ds = c_arg(data_source, "data source")?;
        let id = c_arg(record_id, "record id")?;
        let result =
            unsafe { (self.api.why_record_in_entity)(ds.as_ptr(), id.as_ptr(), flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn why_search(
        &mut self,
        attributes: &str,
        entity_id: EntityId,
        search_profile: &str,
        flags: EngineFlags,
    ) -> Result<String> {
        let attrs = c_arg(attributes, "attributes")?;
        let profile = c_arg(search_profile, "search profile")?;
        let result = unsafe {
            (self.api.why_search)(attrs.as_ptr(), entity_id, profile.as_ptr(), flag_arg(flags))
        };
        self.take_string(Component::Engine, result)
    }

    fn how_entity_by_entity_id(&mut self, entity_id: EntityId, flags: EngineFlags) -> Result<String> {
        let result = unsafe { (self.api.how_entity_by_entity_id)(entity_id, flag_arg(flags)) };
        self.take_string(Component::Engine, result)
    }

    fn export_json_entity_report(&mut self, flags: EngineFlags) -> Result<ExportHandle> {
        let result = unsafe { (self.api.export_json_entity_report)(flag_arg(flags)) };
        self.take_handle(result)
    }

    fn export_csv_entity_report(
        &mut self,
        column_list: &str,
        flags: EngineFlags,
    ) -> Result<ExportHandle> {
        let columns = c_arg(column_list, "column list")?;
        let result =
            unsafe { (self.api.export_csv_entity_report)(columns.as_ptr(), flag_arg(flags)) };
        self.take_handle(result)
    }

    fn fetch_next(&mut self, handle: ExportHandle) -> Result<String> {
        let raw = Self::handle_arg(handle)?;
        let result = unsafe { (self.api.fetch_next)(raw) };
        self.take_string(Component::Engine, result)
    }

    fn close_export_report(&mut self, handle: ExportHandle) -> Result<()> {
        let raw = Self::handle_arg(handle)?;
        let rc = unsafe { (self.api.close_export_report)(raw) };
        self.check(Component::Engine, rc)
    }

    fn get_version(&mut self) -> Result<String> {
        let result = unsafe { (self.api.get_version)() };
        self.take_string(Component::Product, result)
    }

    fn get_license(&mut self) -> Result<String> {
        let result = unsafe { (self.api.get_license)() };
        self.take_string(Component::Product, result)
    }
}
