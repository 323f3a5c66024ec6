//! Registration goes through the process-wide filter slot, so every test in
//! this file holds `SERIAL` while it runs.

use locus::domain::{DispatchError, RegistrationError};
use locus::filter;
use locus::registration::{
    dump_current_filter_to, locate_current_location, register, register_config,
    register_primary_thread, LocatorSlot, SamplerDispatch,
};
use locus::runtime::memory::{FrameSpec, MemoryRuntime};
use locus::{ResolvedLocation, ThreadId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

struct RefusingDispatch;

impl SamplerDispatch for RefusingDispatch {
    fn publish(&self, _locator: locus::registration::Locator) -> Result<(), DispatchError> {
        Err(DispatchError::Unavailable("no locate hook exported".to_string()))
    }
}

fn runtime_with_stack(files: &[(&str, u32)]) -> Arc<MemoryRuntime> {
    let runtime = Arc::new(MemoryRuntime::new());
    runtime.bind_current_thread(ThreadId(1));
    runtime.set_stack(ThreadId(1), files.iter().map(|(file, line)| FrameSpec::new(*file, *line)));
    runtime
}

#[test]
fn test_register_publishes_locator() {
    let _serial = SERIAL.lock();
    let runtime =
        runtime_with_stack(&[("/usr/lib/python3.12/json/decoder.py", 3), ("/proj/app.py", 12)]);
    let sampler = LocatorSlot::new();

    register(&runtime, &sampler, ["/proj/"], "", false).unwrap();

    assert!(sampler.is_bound());
    assert_eq!(sampler.sample(), ResolvedLocation::found("/proj/app.py", 12, 0));
}

#[test]
fn test_reregistration_replaces_filter() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[("/proj/a/inner.py", 5), ("/proj/b/outer.py", 50)]);
    let sampler = LocatorSlot::new();

    register(&runtime, &sampler, ["/proj/b/"], "", false).unwrap();
    assert_eq!(sampler.sample().filename, "/proj/b/outer.py");

    register(&runtime, &sampler, ["/proj/a/"], "", false).unwrap();
    assert_eq!(sampler.sample().filename, "/proj/a/inner.py");
    assert_eq!(filter::current().unwrap().patterns(), ["/proj/a/"]);
}

#[test]
fn test_invalid_registration_keeps_previous_filter() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[("/proj/app.py", 1)]);
    let sampler = LocatorSlot::new();
    register(&runtime, &sampler, ["keep-me"], "", false).unwrap();

    let err = register(&runtime, &sampler, ["fine", ""], "", false).unwrap_err();
    assert!(matches!(err, RegistrationError::EmptyPattern { index: 1 }));

    let err = register(&runtime, &sampler, ["fine"], "relative/dir", false).unwrap_err();
    assert!(matches!(err, RegistrationError::RelativeBasePath(_)));

    assert_eq!(filter::current().unwrap().patterns(), ["keep-me"]);
}

#[test]
fn test_refused_dispatch_is_reported() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[("/proj/app.py", 1)]);

    let err = register(&runtime, &RefusingDispatch, ["refused"], "", false).unwrap_err();
    assert!(matches!(err, RegistrationError::DispatchUnavailable(_)));

    // The filter itself was accepted
    assert_eq!(filter::current().unwrap().patterns(), ["refused"]);
}

#[test]
fn test_closed_sampler_is_reported() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[("/proj/app.py", 1)]);
    let sampler = LocatorSlot::new();
    sampler.close();

    let err = register(&runtime, &sampler, ["x"], "", false).unwrap_err();
    assert!(matches!(err, RegistrationError::DispatchUnavailable(DispatchError::Closed)));
}

#[test]
fn test_dump_current_filter() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[]);
    let sampler = LocatorSlot::new();
    let config = locus::config::FilterConfig::from_json_str(
        r#"{"patterns": ["mymodule", "pkg/foo"], "profile_all": true}"#,
    )
    .unwrap();
    register_config(&runtime, &sampler, &config).unwrap();

    let mut out = Vec::new();
    dump_current_filter_to(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Profile all? 1"));
    assert!(text.contains("\tmymodule\n\tpkg/foo\n"));
}

#[test]
fn test_empty_stack_yields_sentinel() {
    let _serial = SERIAL.lock();
    let runtime = runtime_with_stack(&[]);
    let sampler = LocatorSlot::new();
    register(&runtime, &sampler, ["proj"], "", false).unwrap();

    let loc = sampler.sample();
    assert_eq!(
        (loc.filename.as_str(), loc.line, loc.instruction_offset, loc.found),
        ("<BOGUS>", 1, 0, false)
    );
}

#[test]
fn test_native_thread_uses_registered_primary() {
    let _serial = SERIAL.lock();
    let runtime = Arc::new(MemoryRuntime::new());
    runtime.set_stack(ThreadId(1), [FrameSpec::new("/proj/main.py", 10)]);
    runtime.set_stack(ThreadId(5), [FrameSpec::new("/proj/loader.py", 55)]);
    let sampler = Arc::new(LocatorSlot::new());
    register(&runtime, sampler.as_ref(), ["/proj/"], "", false).unwrap();

    // Sampled from a thread the runtime has never seen
    let native = {
        let sampler = Arc::clone(&sampler);
        thread::spawn(move || sampler.sample()).join().unwrap()
    };
    assert_eq!(native.filename, "/proj/main.py");

    register_primary_thread(ThreadId(5));
    let native = {
        let sampler = Arc::clone(&sampler);
        thread::spawn(move || sampler.sample()).join().unwrap()
    };
    assert_eq!(native.filename, "/proj/loader.py");

    register_primary_thread(ThreadId(1));
}

#[test]
fn test_concurrent_register_and_locate() {
    let _serial = SERIAL.lock();
    let runtime = Arc::new(MemoryRuntime::new());
    for id in 1..=4 {
        runtime.set_stack(
            ThreadId(id),
            [
                FrameSpec::new("/venv/site-packages/lib.py", 1),
                FrameSpec::new(format!("/proj/t{id}/work.py"), 20).offset(6),
            ],
        );
    }
    let sampler = LocatorSlot::new();
    register(&runtime, &sampler, ["/proj/"], "", false).unwrap();

    thread::scope(|s| {
        for w in 0..2 {
            let runtime = &runtime;
            let sampler = &sampler;
            s.spawn(move || {
                for i in 0..300 {
                    let pattern = if (i + w) % 2 == 0 { "/proj/" } else { "/work.py" };
                    register(runtime, sampler, [pattern], "", false).unwrap();
                }
            });
        }
        for id in 1..=4 {
            let runtime = &runtime;
            let sampler = &sampler;
            s.spawn(move || {
                runtime.bind_current_thread(ThreadId(id));
                for _ in 0..1_000 {
                    let loc = sampler.sample();
                    assert!(loc.found);
                    assert_eq!(loc.filename, format!("/proj/t{id}/work.py"));
                    assert_eq!((loc.line, loc.instruction_offset), (20, 6));
                }
                runtime.unbind_current_thread();
            });
        }
    });

    assert!(!runtime.is_locked());
}

#[test]
fn test_locate_without_runtime_initialisation() {
    let _serial = SERIAL.lock();
    let runtime = Arc::new(MemoryRuntime::uninitialized());
    runtime.bind_current_thread(ThreadId(1));
    runtime.set_stack(ThreadId(1), [FrameSpec::new("/proj/app.py", 2)]);
    let sampler = LocatorSlot::new();
    register(&runtime, &sampler, ["/proj/"], "", false).unwrap();

    assert!(locate_current_location(runtime.as_ref()).is_sentinel());
    runtime.set_initialized(true);
    assert!(locate_current_location(runtime.as_ref()).found);
}
