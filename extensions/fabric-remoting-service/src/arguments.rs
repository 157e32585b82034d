use crate::BodyWrapMode;
use fabric_remoting::{CodecError, CodecKind, NamedArgument, RequestBody};
use serde::{Serialize, de::DeserializeOwned};

/// The value parameters of a remoted method, as a tuple.
///
/// A wrapped body serializes the tuple as one value. An unwrapped body
/// serializes each element under its parameter name.
pub trait ArgumentList: Serialize + DeserializeOwned + Send + Sized + 'static {
    const ARITY: usize;

    fn encode_named(
        &self,
        names: &[&'static str],
        codec: CodecKind,
    ) -> Result<Vec<NamedArgument>, CodecError>;

    fn decode_named(
        arguments: &[NamedArgument],
        names: &[&'static str],
        codec: CodecKind,
    ) -> Result<Self, CodecError>;
}

/// Packs an argument tuple into a request body of the given form.
pub fn encode_request_body<A: ArgumentList>(
    args: &A,
    names: &[&'static str],
    mode: BodyWrapMode,
    codec: CodecKind,
) -> Result<RequestBody, CodecError> {
    if A::ARITY == 0 {
        return Ok(RequestBody::Empty);
    }
    match mode {
        BodyWrapMode::Wrapped => Ok(RequestBody::Wrapped(codec.encode(args)?)),
        BodyWrapMode::Unwrapped => Ok(RequestBody::Unwrapped(args.encode_named(names, codec)?)),
    }
}

fn ensure_arity(names: &[&'static str], expected: usize) -> Result<(), CodecError> {
    if names.len() != expected {
        return Err(CodecError::ArityMismatch {
            expected,
            actual: names.len(),
        });
    }
    Ok(())
}

fn find_argument<'a>(arguments: &'a [NamedArgument], name: &str) -> Result<&'a [u8], CodecError> {
    arguments
        .iter()
        .find(|argument| argument.name == name)
        .map(|argument| argument.value.as_slice())
        .ok_or_else(|| CodecError::MissingArgument {
            name: name.to_string(),
        })
}

macro_rules! impl_argument_list {
    ($arity:expr; $($ty:ident => $idx:tt),*) => {
        impl<$($ty),*> ArgumentList for ($($ty,)*)
        where
            $($ty: Serialize + DeserializeOwned + Send + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn encode_named(
                &self,
                names: &[&'static str],
                codec: CodecKind,
            ) -> Result<Vec<NamedArgument>, CodecError> {
                ensure_arity(names, $arity)?;
                Ok(vec![$(NamedArgument::new(names[$idx], codec.encode(&self.$idx)?)),*])
            }

            #[allow(unused_variables)]
            fn decode_named(
                arguments: &[NamedArgument],
                names: &[&'static str],
                codec: CodecKind,
            ) -> Result<Self, CodecError> {
                ensure_arity(names, $arity)?;
                Ok(($(codec.decode::<$ty>(find_argument(arguments, names[$idx])?)?,)*))
            }
        }
    };
}

impl_argument_list!(0;);
impl_argument_list!(1; A => 0);
impl_argument_list!(2; A => 0, B => 1);
impl_argument_list!(3; A => 0, B => 1, C => 2);
impl_argument_list!(4; A => 0, B => 1, C => 2, D => 3);
impl_argument_list!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_argument_list!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
