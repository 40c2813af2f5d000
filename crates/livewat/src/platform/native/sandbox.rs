//! Wasmtime-backed sandbox.
//!
//! The engine runs with async support, so instantiation and the call to
//! `main` are real suspension points. With fuel metering enabled the guest
//! yields back to the executor every `fuel_yield_interval` units, which keeps
//! a runaway `main` from starving the frame loop.

use log::trace;
use wasmtime::{Config, Engine, Extern, Func, Instance, Module, Store, Trap, Val};

use crate::config::HostConfig;
use crate::diagnostic::Diagnostic;
use crate::execution::{ENTRY_POINT, EntryPoint, Sandbox};
use crate::value::Value;

pub struct WasmtimeSandbox {
    engine: Engine,
    fuel_yield_interval: Option<u64>,
}

impl WasmtimeSandbox {
    pub fn new(config: &HostConfig) -> wasmtime::Result<Self> {
        let fuel_yield_interval = config.fuel_yield_interval();
        let mut engine_config = Config::new();
        engine_config.async_support(true);
        engine_config.consume_fuel(fuel_yield_interval.is_some());
        Ok(Self {
            engine: Engine::new(&engine_config)?,
            fuel_yield_interval,
        })
    }

    fn new_store(&self) -> wasmtime::Result<Store<()>> {
        let mut store = Store::new(&self.engine, ());
        if let Some(interval) = self.fuel_yield_interval {
            store.set_fuel(u64::MAX)?;
            store.fuel_async_yield_interval(Some(interval))?;
        }
        Ok(store)
    }
}

/// Instance together with the store it lives in.
pub struct WasmtimeInstance {
    store: Store<()>,
    main: Func,
}

impl Sandbox for WasmtimeSandbox {
    type Instance = WasmtimeInstance;

    async fn instantiate(&self, bytes: Vec<u8>) -> Result<WasmtimeInstance, Diagnostic> {
        let module = Module::new(&self.engine, &bytes).map_err(describe_error)?;
        let mut store = self.new_store().map_err(describe_error)?;
        let instance = Instance::new_async(&mut store, &module, &[])
            .await
            .map_err(describe_error)?;

        let main = match instance.get_export(&mut store, ENTRY_POINT) {
            Some(Extern::Func(main)) => main,
            Some(_) => {
                return Err(Diagnostic::new(format!(
                    "export `{ENTRY_POINT}` is not a function"
                )));
            }
            None => {
                return Err(Diagnostic::new(format!(
                    "module does not export a `{ENTRY_POINT}` function"
                )));
            }
        };
        Ok(WasmtimeInstance { store, main })
    }
}

impl EntryPoint for WasmtimeInstance {
    async fn call_main(&mut self) -> Result<Value, Diagnostic> {
        let result_count = self.main.ty(&self.store).results().len();
        let mut results = vec![Val::I32(0); result_count];
        self.main
            .call_async(&mut self.store, &[], &mut results)
            .await
            .map_err(describe_error)?;
        if let Ok(remaining) = self.store.get_fuel() {
            trace!("`{ENTRY_POINT}` finished, {} fuel consumed", u64::MAX - remaining);
        }

        let mut values: Vec<Value> = results.iter().map(to_value).collect();
        Ok(match values.len() {
            0 => Value::Void,
            1 => values.remove(0),
            _ => Value::Multiple(values),
        })
    }
}

fn to_value(val: &Val) -> Value {
    match val {
        Val::I32(value) => Value::I32(*value),
        Val::I64(value) => Value::I64(*value),
        Val::F32(bits) => Value::F32(f32::from_bits(*bits)),
        Val::F64(bits) => Value::F64(f64::from_bits(*bits)),
        Val::V128(value) => Value::V128(value.as_u128()),
        Val::FuncRef(None) | Val::ExternRef(None) | Val::AnyRef(None) => {
            Value::Reference("null".to_owned())
        }
        Val::FuncRef(Some(_)) => Value::Reference("funcref".to_owned()),
        Val::ExternRef(Some(_)) => Value::Reference("externref".to_owned()),
        _ => Value::Reference("anyref".to_owned()),
    }
}

fn describe_error(error: wasmtime::Error) -> Diagnostic {
    match error.downcast_ref::<Trap>() {
        Some(trap) => Diagnostic::new(trap.to_string()),
        None => Diagnostic::new(format!("{error:#}")),
    }
}
