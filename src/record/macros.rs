//! `record!` macro for declaring record types.

/// Declare a record type.
///
/// The macro adds an `identity` field (skipped by serde and private to the
/// declaring module, where constructors set it to [`Identity::transient`]),
/// derives
/// `Clone`, `Debug`, `Serialize` and `Deserialize`, implements [`Record`]
/// with the struct name as `TYPE_NAME`, and implements `PartialEq` with
/// identity-aware equality. Each field also gets an associated accessor of
/// the same name returning a [`Field`] for building predicates:
///
/// ```ignore
/// warehub_store::record! {
///     pub struct Project {
///         pub name: String,
///         #[serde(default)]
///         pub total_size: u64,
///     }
/// }
///
/// let big = Project::name().eq("^warehub").and(Project::total_size().gt(1024u64));
/// ```
///
/// The invoking crate must depend on `serde`.
///
/// [`Record`]: crate::Record
/// [`Identity::transient`]: crate::Identity::transient
/// [`Field`]: crate::Field
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            #[serde(skip)]
            identity: $crate::Identity,
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn identity(&self) -> &$crate::Identity {
                &self.identity
            }

            fn identity_mut(&mut self, _key: $crate::IdentityKey) -> &mut $crate::Identity {
                &mut self.identity
            }
        }

        impl ::core::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                $crate::Record::same_entry(self, other, || {
                    true $(&& self.$field == other.$field)*
                })
            }
        }

        #[allow(dead_code)]
        impl $name {
            $(
                $field_vis fn $field() -> $crate::Field<$name, $ty> {
                    fn get(record: &$name) -> &$ty {
                        &record.$field
                    }
                    $crate::Field::new(stringify!($field), get)
                }
            )*
        }
    };
}
