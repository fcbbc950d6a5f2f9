//! Adapter from strongly typed handlers to the uniform dispatch signature.
//!
//! A command body is written as an ordinary function whose parameters after
//! the suite context are the decoded arguments:
//!
//! ```rust,ignore
//! fn connect(gap: &mut Gap, peer: Address, interval: u16, response: &mut Response)
//! ```
//!
//! [`IntoHandler`] turns any such function (0 to 11 typed arguments) into a
//! boxed [`Handler`]. When invoked, the handler decodes token `i` into the
//! `i`-th parameter type with the [codec](crate::codec); the first failure
//! writes an `InvalidParameters` response describing the offending argument
//! and the body is never called:
//!
//! ```text
//! {"index":1,"name":"interval","type":"uint16_t","description":"...","reason":"malformed"}
//! ```

use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;

use super::{CommandArgDescriptor, CommandArgs, Response, StatusCode};
use crate::codec::{Decode, DecodeError};

/// Uniform entry point stored in a command table.
pub trait Handler<C> {
    /// Decode `args` as needed and run the command against `response`.
    fn call(
        &self,
        context: &mut C,
        descriptors: &[CommandArgDescriptor],
        args: CommandArgs<'_>,
        response: &mut Response,
    );
}

/// Conversion of a typed function into a boxed [`Handler`].
///
/// `Args` is the tuple of decoded parameter types; it only exists to keep
/// the implementations for different arities apart and is always inferred.
pub trait IntoHandler<C, Args> {
    /// Box the adapted handler.
    fn into_handler(self) -> Box<dyn Handler<C>>;
}

/// Handler taking its tokens undecoded.
pub(crate) struct Raw<F>(pub(crate) F);

impl<C, F> Handler<C> for Raw<F>
where
    F: Fn(&mut C, CommandArgs<'_>, &mut Response),
{
    fn call(
        &self,
        context: &mut C,
        _descriptors: &[CommandArgDescriptor],
        args: CommandArgs<'_>,
        response: &mut Response,
    ) {
        (self.0)(context, args, response);
    }
}

/// A typed function together with the tuple of its argument types.
pub struct Typed<F, Args> {
    function: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> fmt::Debug for Typed<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Typed")
    }
}

/// Decode the token at `index`, reporting a failure on `response`.
fn decode_argument<T: Decode>(
    descriptors: &[CommandArgDescriptor],
    args: CommandArgs<'_>,
    index: usize,
    response: &mut Response,
) -> Option<T> {
    let decoded = match args.get(index) {
        Some(token) => T::decode(token),
        None => Err(DecodeError::Missing),
    };

    match decoded {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("argument {=usize} failed to decode: {}", index, error);
            report_decode_failure(descriptors.get(index), index, T::TYPE_NAME, error, response);
            None
        }
    }
}

fn report_decode_failure(
    descriptor: Option<&CommandArgDescriptor>,
    index: usize,
    type_name: &'static str,
    error: DecodeError,
    response: &mut Response,
) {
    if !response.set_status_code(StatusCode::InvalidParameters) {
        return;
    }
    let Some(writer) = response.result_stream() else {
        return;
    };

    writer.start_object();
    writer.key("index").uint(index as u64);
    if let Some(descriptor) = descriptor {
        writer.key("name").string(descriptor.name);
    }
    writer
        .key("type")
        .string(descriptor.map_or(type_name, |d| d.type_name));
    if let Some(descriptor) = descriptor {
        writer.key("description").string(descriptor.description);
    }
    writer.key("reason").string(error.reason());
    if let Some(labels) = error.expected() {
        writer.key("expected").start_array();
        labels.for_each_label(&mut |label| {
            writer.string(label);
        });
        writer.end_array();
    }
    writer.end_object();
}

macro_rules! typed_handler {
    ($($ty:ident $index:tt),*) => {
        impl<C, F, $($ty,)*> Handler<C> for Typed<F, ($($ty,)*)>
        where
            F: Fn(&mut C, $($ty,)* &mut Response),
            $($ty: Decode,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(
                &self,
                context: &mut C,
                descriptors: &[CommandArgDescriptor],
                args: CommandArgs<'_>,
                response: &mut Response,
            ) {
                $(
                    let Some($ty) = decode_argument::<$ty>(descriptors, args, $index, response) else {
                        return;
                    };
                )*
                (self.function)(context, $($ty,)* response);
            }
        }

        impl<C: 'static, F, $($ty,)*> IntoHandler<C, ($($ty,)*)> for F
        where
            F: Fn(&mut C, $($ty,)* &mut Response) + 'static,
            $($ty: Decode + 'static,)*
        {
            fn into_handler(self) -> Box<dyn Handler<C>> {
                Box::new(Typed {
                    function: self,
                    _args: PhantomData,
                })
            }
        }
    };
}

typed_handler!();
typed_handler!(T0 0);
typed_handler!(T0 0, T1 1);
typed_handler!(T0 0, T1 1, T2 2);
typed_handler!(T0 0, T1 1, T2 2, T3 3);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9);
typed_handler!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7, T8 8, T9 9, T10 10);
