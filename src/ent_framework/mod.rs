// Page framework - lifecycle hooks wrapped around page mutations

pub mod ent_hooks;

pub use ent_hooks::{
    create_default_hook_registry, HookContext, HookOperation, HookRegistry, HookTiming, PageHook,
};
