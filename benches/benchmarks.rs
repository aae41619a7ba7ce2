use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::executor::LocalPool;

use nsreload::invalidate::force_reload;
use nsreload::load_queue::ScriptLoader;
use nsreload::namespace::{Namespace, ReloadMode, ScriptPath};
use nsreload::registry::Registry;
use nsreload::script::{DocumentState, ReadySignal, ScriptElement, ScriptHost};
use std::cell::RefCell;
use std::rc::Rc;

struct InstantHost;

impl ScriptHost for InstantHost {
    fn document_state(&self) -> DocumentState {
        DocumentState::Complete
    }
    fn insert_script(&self, element: ScriptElement, ready: ReadySignal) -> anyhow::Result<()> {
        black_box(element);
        ready.resolve(());
        Ok(())
    }
}

fn chain_registry(depth: usize) -> Registry {
    let mut registry = Registry::new(Namespace::from("cljs.core"), "/out/");
    for x in 0..depth {
        let name = format!("n{}", x);
        let path = format!("n{}.js", x);
        let next = format!("n{}", x + 1);
        registry.add_dependency(path.as_str(), &[name.as_str()], &["cljs.core", next.as_str()]);
    }
    registry
}

fn test_force_reload_chain() {
    let mut registry = chain_registry(5000);
    registry.mark_all_loaded();
    let res = force_reload(&mut registry, &Namespace::from("n0"), ReloadMode::All);
    black_box(res.len());
}

fn test_load_queue() {
    let mut pool = LocalPool::new();
    let registry = Rc::new(RefCell::new(Registry::new(Namespace::from("cljs.core"), "")));
    let loader = ScriptLoader::new(registry, Rc::new(InstantHost), pool.spawner(), "deps.js");

    for x in 0..5000 {
        let path = ScriptPath::from(format!("p{}.js", x));
        loader.load(&path, None).expect("load failed");
    }
    pool.run_until_stalled();
    assert!(!loader.is_loading());
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("force_reload chain", |b| b.iter(test_force_reload_chain));
    c.bench_function("load queue drain", |b| b.iter(test_load_queue));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
