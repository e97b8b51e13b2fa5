//! Wires three mutually dependent services through the global container.
//!
//! Run with `RUST_LOG=mustawda=debug cargo run --example wiring` to see
//! the resolution order.

use std::sync::Arc;

use mustawda::global::{self, global};
use mustawda::prelude::*;
use tracing_subscriber::EnvFilter;

static A_B: Inject<B> = Inject::new("b");
static A_C: Inject<C> = Inject::new("c");
static A_D: Inject<D> = Inject::new("d");
static C_A: Inject<A> = Inject::new("a");

struct A;

impl A {
    fn new() -> Result<Self> {
        println!("A()");
        let c = A_C.get_global()?;
        c.f();
        c.f();
        println!("/A()");
        Ok(A)
    }

    fn f(&self) -> Result<Arc<B>> {
        println!("A.f()");
        A_B.get_global()
    }

    fn c(&self) -> Result<Arc<C>> {
        A_C.get_global()
    }

    fn d(&self) -> Result<Arc<D>> {
        A_D.get_global()
    }
}

struct B;

impl B {
    fn new(a: i32) -> Self {
        println!("B({a})");
        B
    }
}

struct C;

impl C {
    fn new() -> Self {
        println!("C()");
        C
    }

    fn f(&self) {
        println!("C.f()");
    }

    fn a(&self) -> Result<Arc<A>> {
        C_A.get_global()
    }
}

struct D;

fn failing() -> Result<D> {
    Err(MustawdaError::construction("hello"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mustawda=info")),
        )
        .init();

    global::register("b", Provider::new(|_, args| Ok(B::new(*args.positional::<i32>(0)?))).arg(2))?;
    global::register("a", Provider::from_fn(|_| A::new()))?;
    global::register("c", Provider::from_fn(|_| Ok(C::new())))?;
    global::register("d", Provider::from_fn(|_| failing()))?;

    let hello = inject_args(["a"]).wrap(
        Signature::new("hello").param("a"),
        |_: (), kwargs: Kwargs| -> Result<Arc<A>> {
            let a = kwargs.get::<A>("a")?;
            a.f()?;
            Ok(a)
        },
    )?;

    let a = hello.call(global(), (), Kwargs::new())??;
    println!();
    let aa = hello.call(global(), (), Kwargs::new())??;

    assert!(Arc::ptr_eq(&a.f()?, &aa.f()?));
    assert!(Arc::ptr_eq(&a.c()?, &aa.c()?));
    assert!(Arc::ptr_eq(&a.c()?.a()?, &a));

    match a.d() {
        Err(MustawdaError::Construction(err)) => println!("d failed as expected: {err}"),
        Err(other) => return Err(other),
        Ok(_) => unreachable!("d never constructs"),
    }

    Ok(())
}
