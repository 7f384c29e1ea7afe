//! Handler decoration.
//!
//! A [`Decorator`] takes a value, usually a [`RequestHandler`](crate::handler::RequestHandler),
//! and wraps it into a new one. Decorators compose with [`DecoratorExt::and_then`]: the first
//! decorator applied is the innermost, so in `a.and_then(b)` the wrapper produced by `b` sees
//! the request first and the reply last.

/// Wraps `In` into `Self::Out`
pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}

pub trait DecoratorExt<In>: Decorator<In> {
    /// Applies `self` first, then `decorator` around its output
    fn and_then<D>(self, decorator: D) -> DecoratorComposer<Self, D>
    where
        Self: Sized,
    {
        DecoratorComposer::new(self, decorator)
    }

    /// Applies `decorator` first, then `self` around its output
    fn compose<D>(self, decorator: D) -> DecoratorComposer<D, Self>
    where
        Self: Sized,
    {
        DecoratorComposer::new(decorator, self)
    }
}

impl<T: Decorator<In> + ?Sized, In> DecoratorExt<In> for T {}

/// Two decorators applied one after the other, `inner` first
#[derive(Debug, Clone, Copy)]
pub struct DecoratorComposer<D1, D2> {
    inner: D1,
    outer: D2,
}

impl<D1, D2> DecoratorComposer<D1, D2> {
    pub fn new(inner: D1, outer: D2) -> Self {
        Self { inner, outer }
    }
}

impl<In, D1, D2> Decorator<In> for DecoratorComposer<D1, D2>
where
    D1: Decorator<In>,
    D2: Decorator<D1::Out>,
{
    type Out = D2::Out;

    fn decorate(&self, raw: In) -> Self::Out {
        self.outer.decorate(self.inner.decorate(raw))
    }
}

/// Leaves its input untouched
#[derive(Default, Clone, Copy, Debug)]
pub struct IdentityDecorator;

impl<In> Decorator<In> for IdentityDecorator {
    type Out = In;

    #[inline]
    fn decorate(&self, raw: In) -> Self::Out {
        raw
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DecoratorFn<F> {
    f: F,
}

/// Turns a closure into a [`Decorator`]
pub fn decorator_fn<In, Out, F>(f: F) -> DecoratorFn<F>
where
    F: Fn(In) -> Out,
{
    DecoratorFn { f }
}

impl<In, Out, F> Decorator<In> for DecoratorFn<F>
where
    F: Fn(In) -> Out,
{
    type Out = Out;

    fn decorate(&self, raw: In) -> Self::Out {
        (self.f)(raw)
    }
}
