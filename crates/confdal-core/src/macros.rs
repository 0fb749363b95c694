/// Implements `From<$ty> for Value` for primitive types mapping one-to-one
/// onto a `Value` variant.
macro_rules! impl_value_from {
    ( $( $ty:ty => $variant:ident ),+ $(,)? ) => {
        $(
            impl From<$ty> for $crate::Value {
                fn from(src: $ty) -> Self {
                    Self::$variant(src)
                }
            }
        )+
    };
}
