pub use enclose::*;

#[macro_export]
macro_rules! autorun {
	(( $($d_tt:tt)* ) => $($b:tt)*) => {
		$crate::autorun($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
	};
	($($b:tt)*) => {
		$crate::autorun(move || { $($b)* })
	};
}

#[macro_export]
macro_rules! batch {
	(( $($d_tt:tt)* ) => $($b:tt)*) => {
		$crate::batch($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
	};
	($($b:tt)*) => {
		$crate::batch(move || { $($b)* })
	};
}

#[macro_export]
macro_rules! object {
	{} => {
		$crate::Value::Object(::std::default::Default::default())
	};
	{ $( $key:expr => $value:expr ),+ $(,)? } => {
		$crate::Value::object([ $( ($key, $crate::Value::from($value)) ),+ ])
	};
}

#[macro_export]
macro_rules! array {
	[] => {
		$crate::Value::Array(::std::vec::Vec::new())
	};
	[ $( $value:expr ),+ $(,)? ] => {
		$crate::Value::Array(::std::vec![ $( $crate::Value::from($value) ),+ ])
	};
}
