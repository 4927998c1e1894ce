use std::rc::Rc;

use heapcore::runtime::{
    closure::define_recursive,
    compiled_function::CompiledFunction,
    environment::{Environment, ParentLink},
    error::RuntimeError,
    gc::{GcHeap, RootSet},
    handle::Handle,
    leak_detector::{all_reclaimed, live_count},
    value::{Map, Value},
    vm::Vm,
};

fn function(name: &str, params: &[&str]) -> Rc<CompiledFunction> {
    Rc::new(CompiledFunction::new(Some(name), params, 0))
}

#[test]
fn live_value_is_never_reclaimed_early() {
    let mut heap = GcHeap::new();
    let list = heap.alloc_list(vec![Value::Number(1.0)]).unwrap();
    let copy = list.clone();
    assert_eq!(live_count(&list), 2);

    drop(copy);
    assert_eq!(live_count(&list), 1);
    assert_eq!(heap.registry_size(), 1);
    assert_eq!(list.borrow().unwrap().len(), 1);
}

#[test]
fn acyclic_graph_is_reclaimed_deterministically() {
    let mut heap = GcHeap::new();
    let leaf_a = heap.alloc_list(vec![]).unwrap();
    let leaf_b = heap.alloc_map(Map::new()).unwrap();
    let shared = heap.alloc_list(vec![]).unwrap();
    let mut entries = Map::new();
    entries.insert("a".into(), Value::List(leaf_a));
    entries.insert("b".into(), Value::Map(leaf_b));
    entries.insert("shared".into(), Value::List(shared.clone()));
    let root = heap.alloc_map(entries).unwrap();
    assert_eq!(heap.registry_size(), 4);

    drop(root);
    // `shared` is still held outside, so only three values go.
    assert_eq!(heap.registry_size(), 1);
    assert_eq!(live_count(&shared), 1);
    assert_eq!(heap.total_collections(), 0);
}

#[test]
fn mutual_ownership_survives_counting_and_dies_under_tracing() {
    let mut heap = GcHeap::new();
    let a = heap.alloc_list(vec![]).unwrap();
    let b = heap.alloc_list(vec![Value::List(a.clone())]).unwrap();
    a.borrow_mut().unwrap().push(Value::List(b.clone()));
    let observed = vec![a.downgrade(), b.downgrade()];
    drop(a);
    drop(b);

    assert!(observed.iter().all(|weak| weak.live_count() >= 1));
    assert_eq!(heap.registry_size(), 2);

    heap.collect(&RootSet::new()).unwrap();
    assert!(all_reclaimed(&observed));
    assert_eq!(heap.registry_size(), 0);
    for weak in &observed {
        assert!(!heap.is_registered(weak.id()));
    }
}

#[test]
fn recursive_closure_is_reclaimed_without_collection() {
    let mut heap = GcHeap::new();
    let env = heap.alloc_environment(Environment::new(None)).unwrap();
    let closure = define_recursive(&mut heap, &env, "fact", function("fact", &["n"])).unwrap();

    // One call: a call environment with a weak parent, dropped on return.
    let call_env = heap
        .alloc_environment(Environment::new(Some(ParentLink::Weak(
            closure.borrow().unwrap().env.downgrade(),
        ))))
        .unwrap();
    call_env.define("n", Value::Number(3.0)).unwrap();
    assert!(matches!(call_env.get("fact").unwrap(), Some(Value::Function(_))));
    drop(call_env);

    let weak_closure = closure.downgrade();
    let weak_env = env.downgrade();
    drop(env);
    drop(closure);

    assert_eq!(weak_closure.live_count(), 0);
    assert_eq!(weak_env.live_count(), 0);
    assert_eq!(heap.registry_size(), 0);
    assert_eq!(heap.total_collections(), 0);
}

#[test]
fn weak_upgrade_after_collection_returns_none() {
    let mut heap = GcHeap::new();
    let list = heap.alloc_list(vec![]).unwrap();
    list.borrow_mut().unwrap().push(Value::List(list.clone()));
    let weak = list.downgrade();
    drop(list);

    heap.collect(&RootSet::new()).unwrap();
    assert!(weak.upgrade().is_none());

    // The recycled slot gets a new identity; the stale weak handle stays dead.
    let fresh = heap.alloc_list(vec![]).unwrap();
    assert_eq!(fresh.id().index(), weak.id().index());
    assert_ne!(fresh.id(), weak.id());
    assert!(weak.upgrade().is_none());
}

#[test]
fn nested_mutation_is_rejected() {
    let mut vm = Vm::new().unwrap();
    let list = vm.alloc_list(vec![]).unwrap();
    let Value::List(handle) = &list else {
        panic!("expected list")
    };
    let push = vm.lookup("push").unwrap();

    let mut token = handle.borrow_mut().unwrap();
    token.push(Value::Number(1.0));
    let err = vm
        .call_value(push, vec![list.clone(), Value::Number(2.0)])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::ReentrantAccess { .. }));
    assert!(err.is_recoverable());
    drop(token);

    assert_eq!(list.to_string(), "[1]");
}

#[test]
fn self_insertion_leaks_until_forced_collection() {
    let mut vm = Vm::new().unwrap();
    let baseline = vm.registry_size();

    let list = vm.alloc_list(vec![]).unwrap();
    let push = vm.lookup("push").unwrap();
    vm.call_value(push, vec![list.clone(), list.clone()]).unwrap();
    drop(list);
    assert_eq!(vm.registry_size(), baseline + 1);

    vm.force_collect().unwrap();
    assert_eq!(vm.registry_size(), baseline);
}

#[test]
fn dropping_vm_releases_global_environment() {
    let vm = Vm::new().unwrap();
    let globals = vm.globals().clone();
    drop(vm);
    assert_eq!(live_count(&globals), 1);
}

#[test]
fn counter_closure_keeps_its_state() {
    let mut vm = Vm::new().unwrap();
    let globals = vm.globals().clone();
    let scope = vm
        .new_environment(Some(ParentLink::Owning(globals.clone())))
        .unwrap();
    scope.define("count", Value::Number(0.0)).unwrap();
    let Value::Function(counter) = vm
        .make_closure(&scope, function("increment", &[]))
        .unwrap()
    else {
        panic!("expected function")
    };
    drop(scope);

    for expected in 1..=3 {
        let result = vm
            .call_function(&counter, vec![], |vm, _, _| {
                let next = vm.lookup("count")?.as_number().unwrap_or(0.0) + 1.0;
                vm.assign("count", Value::Number(next))?;
                Ok(Value::Number(next))
            })
            .unwrap();
        assert_eq!(result, Value::Number(expected as f64));
    }

    let before = vm.registry_size();
    drop(counter);
    assert_eq!(vm.registry_size(), before - 2);
}

const COUNTDOWN: usize = 0;
const OUTER: usize = 1;

/// Counts `n` down by calling the running function by name; `OUTER` defines
/// such a countdown inside its own frame and runs it.
fn run_body(
    vm: &mut Vm,
    function: &CompiledFunction,
    env: &Handle<Environment>,
) -> Result<Value, RuntimeError> {
    match function.entry {
        COUNTDOWN => {
            let n = vm.lookup("n")?.as_number().unwrap_or(0.0);
            if n <= 0.0 {
                return Ok(Value::text("done"));
            }
            let me = vm.lookup(function.display_name())?;
            vm.call_value(me, vec![Value::Number(n - 1.0)])
        }
        OUTER => {
            let inner = vm.define_function(env, "inner", function_at("inner", &["n"], COUNTDOWN))?;
            vm.call_value(inner, vec![Value::Number(5.0)])
        }
        _ => Ok(Value::Nothing),
    }
}

fn function_at(name: &str, params: &[&str], entry: usize) -> Rc<CompiledFunction> {
    Rc::new(CompiledFunction::new(Some(name), params, entry))
}

fn vm_with_executor() -> Vm {
    let mut vm = Vm::new().unwrap();
    vm.set_executor(Rc::new(run_body));
    vm
}

#[test]
fn top_level_recursive_function_is_reclaimed_after_calls() {
    let mut vm = vm_with_executor();
    let baseline = vm.registry_size();
    let globals = vm.globals().clone();
    let scope = vm
        .new_environment(Some(ParentLink::Owning(globals)))
        .unwrap();
    let countdown = vm
        .define_function(&scope, "countdown", function_at("countdown", &["n"], COUNTDOWN))
        .unwrap();
    let Value::Function(closure) = &countdown else {
        panic!("expected function")
    };
    let (weak_closure, weak_scope) = (closure.downgrade(), scope.downgrade());
    drop(scope);

    let result = vm.call_value(countdown.clone(), vec![Value::Number(10.0)]).unwrap();
    assert_eq!(result, Value::text("done"));
    assert_eq!(vm.frame_depth(), 0);

    drop(countdown);
    assert_eq!(weak_closure.live_count(), 0);
    assert_eq!(weak_scope.live_count(), 0);
    assert_eq!(vm.registry_size(), baseline);
    assert_eq!(vm.heap().total_collections(), 0);
}

#[test]
fn function_defined_inside_a_call_is_reclaimed_when_it_returns() {
    let mut vm = vm_with_executor();
    let baseline = vm.registry_size();
    let globals = vm.globals().clone();
    let outer = vm
        .make_closure(&globals, function_at("outer", &[], OUTER))
        .unwrap();

    for _ in 0..3 {
        let result = vm.call_value(outer.clone(), vec![]).unwrap();
        assert_eq!(result, Value::text("done"));
    }
    // Only `outer` itself is left.
    assert_eq!(vm.registry_size(), baseline + 1);

    drop(outer);
    assert_eq!(vm.registry_size(), baseline);
    assert_eq!(vm.heap().total_collections(), 0);
}
