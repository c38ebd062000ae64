/// Implements an operator trait for a single-field newtype by forwarding to the inner value.
///
/// ```rust,ignore
/// op!(binary Money, Add, add);        // Money + Money
/// op!(inplace Money, AddAssign, add_assign); // Money += Money
/// op!(unary Money, Neg, neg);         // -Money
/// ```
#[macro_export]
macro_rules! op {
    (binary $ty:ty, $imp:ident, $method:ident) => {
        impl $imp for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self($imp::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $ty:ty, $imp:ident, $method:ident) => {
        impl $imp for $ty {
            fn $method(&mut self, rhs: Self) {
                $imp::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $ty:ty, $imp:ident, $method:ident) => {
        impl $imp for $ty {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self($imp::$method(self.0))
            }
        }
    };
}
