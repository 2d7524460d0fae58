//! Suite registry: named, ordered, append-only collections of tests.

use std::collections::HashMap;
use std::fmt;

use crate::outcome::TestResult;
use crate::test_context::TestContext;

/// Signature of a test body.
pub type TestBody = dyn Fn(&TestContext<'_>) -> TestResult;

/// A named unit of behavior. Immutable once registered.
pub struct Test {
    name: String,
    body: Box<TestBody>,
}

impl Test {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TestContext<'_>) -> TestResult + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the body directly, without any fault isolation.
    pub fn invoke(&self, ctx: &TestContext<'_>) -> TestResult {
        (self.body)(ctx)
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named, ordered collection of tests run together.
///
/// Tests run in registration order. Duplicate names are accepted; attribution
/// is positional, see [`Suite::duplicate_names`].
#[derive(Debug)]
pub struct Suite {
    name: String,
    tests: Vec<Test>,
}

impl Suite {
    /// Create an empty suite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    /// Append a test.
    pub fn link<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&TestContext<'_>) -> TestResult + 'static,
    {
        self.tests.push(Test::new(name, body));
        self
    }

    /// Builder form of [`Suite::link`].
    #[must_use]
    pub fn with_test<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TestContext<'_>) -> TestResult + 'static,
    {
        self.link(name, body);
        self
    }

    /// Append an already constructed test.
    pub fn push(&mut self, test: Test) -> &mut Self {
        self.tests.push(test);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Names registered more than once, in first-appearance order.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for test in &self.tests {
            let count = seen.entry(test.name()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicates.push(test.name());
            }
        }
        duplicates
    }
}
