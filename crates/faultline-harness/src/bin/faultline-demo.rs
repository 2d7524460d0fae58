//! Demo run: a passing/failing pair, cleanup on failure, and a suite that crashes.
//!
//! Exits 0 after all suites ran, even though some tests fail.

#![allow(unsafe_code)]

use std::collections::HashMap;

use faultline_core::{Suite, check, check_clean, check_clean_log, fail, pass};
use faultline_harness::{Harness, HarnessConfig};

fn example() -> Suite {
    let mut suite = Suite::new("Example");
    suite
        .link("Addition", |ctx| {
            let a = 5;
            let b = 10;
            check!(ctx, a + b == 15);
            pass!();
        })
        .link("Comparison", |ctx| {
            let x = 7;
            check!(ctx, x > 10);
            fail!(ctx);
        });
    suite
}

fn cleanup() -> Suite {
    Suite::new("Cleanup")
        .with_test("Vector_Test", |ctx| {
            let mut values: Vec<i32> = Vec::new();
            check!(ctx, values.is_empty());
            values.push(5);
            check_clean!(ctx, values.len() == 1, || drop(values));
            check_clean!(ctx, values[0] == 5, || {
                ctx.log("releasing vector");
                drop(values);
            });
            pass!();
        })
        .with_test("Map_Test", |ctx| {
            let mut map: HashMap<String, i32> = HashMap::new();
            map.insert("test".to_string(), 5);
            check!(ctx, map.len() == 1);
            let value = map.get("test").copied();
            check_clean_log!(
                ctx,
                value == Some(6),
                || {
                    map.clear();
                    ctx.log("map released");
                },
                "Value in map is not correct: {:?}",
                value
            );
            pass!();
        })
}

fn intentional_fail() -> Suite {
    Suite::new("Intentional_Fail")
        .with_test("Null_Deref", |ctx| {
            ctx.log("This test should segfault");
            let ptr = std::ptr::null::<i32>().wrapping_add(2);
            let value = unsafe { std::ptr::read_volatile(ptr) };
            ctx.log(format!("read {value}"));
            pass!();
        })
        .with_test("Div_Trap", |ctx| {
            ctx.log("This test raises SIGFPE");
            unsafe {
                libc::raise(libc::SIGFPE);
            }
            pass!();
        })
        .with_test("Bad_Assert", |ctx| {
            check!(ctx, 1 == 0);
            pass!();
        })
        .with_test("Still_Runs", |ctx| {
            ctx.log("Suite continues after the crashes above");
            pass!();
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut harness = Harness::init(&HarnessConfig::from_cli())?;
    harness.log("Running tests...");
    harness.run_suite(example())?;
    harness.run_suite(cleanup())?;
    harness.log("The following suite should fail");
    harness.run_suite(intentional_fail())?;
    harness.finish()?;
    Ok(())
}
