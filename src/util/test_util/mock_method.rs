//! Recorders for the hooks of the mock runtime. A [`MockMethod`] counts its calls and forwards
//! them to a replaceable closure, so tests can both observe and script what the runtime does.

pub struct MockMethod<I, R> {
    imp: MockImpl<I, R>,
}

pub enum MockImpl<I, R> {
    /// Calls cycle through the closures.
    Sequence(Vec<MockClosure<I, R>>),
    Fixed(MockClosure<I, R>),
}

pub type MockClosureSignature<I, R> = Box<dyn Fn(I) -> R + Send + Sync>;

pub struct MockClosure<I, R> {
    closure: MockClosureSignature<I, R>,
    call_count: usize,
}

impl<I, R> MockClosure<I, R> {
    fn new(closure: MockClosureSignature<I, R>) -> Self {
        Self {
            closure,
            call_count: 0,
        }
    }
    fn call(&mut self, args: I) -> R {
        self.call_count += 1;
        (self.closure)(args)
    }
}

impl<I, R: Default> std::default::Default for MockMethod<I, R> {
    fn default() -> Self {
        Self::new_default()
    }
}

impl<I, R> MockMethod<I, R> {
    /// A method that must not be called.
    pub fn new_unimplemented() -> Self {
        Self::new_fixed(Box::new(|_| unimplemented!()))
    }

    /// A method that returns the default value of its return type (a no-op for `()`).
    pub fn new_default() -> Self
    where
        R: Default,
    {
        Self::new_fixed(Box::new(|_| R::default()))
    }

    pub fn new_fixed(closure: MockClosureSignature<I, R>) -> Self {
        Self {
            imp: MockImpl::Fixed(MockClosure::new(closure)),
        }
    }

    pub fn new_sequence(closures: Vec<MockClosureSignature<I, R>>) -> Self {
        Self {
            imp: MockImpl::Sequence(closures.into_iter().map(MockClosure::new).collect()),
        }
    }

    pub fn call(&mut self, args: I) -> R {
        let cur_call = self.call_count();

        match &mut self.imp {
            MockImpl::Sequence(closures) => {
                let len = closures.len();
                closures[cur_call % len].call(args)
            }
            MockImpl::Fixed(closure) => closure.call(args),
        }
    }

    pub fn is_called(&self) -> bool {
        self.call_count() > 0
    }

    pub fn call_count(&self) -> usize {
        match &self.imp {
            MockImpl::Fixed(c) => c.call_count,
            MockImpl::Sequence(vec) => vec.iter().map(|c| c.call_count).sum(),
        }
    }
}
