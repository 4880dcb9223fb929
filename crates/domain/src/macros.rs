/// `Uuid` を包む ID 型を定義する
///
/// `Display` と `FromStr` は UUID の正規形（ハイフン区切り小文字 16 進）を使う。
/// 返信先アドレスの署名対象文字列と、PostgREST の `in.(...)` フィルタは
/// この表現に依存する。
///
/// ```rust
/// use std::str::FromStr;
///
/// use seido_domain::intervention::InterventionId;
///
/// let id = InterventionId::new();
/// assert_eq!(InterventionId::from_str(&id.to_string()).unwrap(), id);
/// ```
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display,
        )]
        #[display("{_0}")]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            /// UUID v7
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::str::FromStr for $Name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    $crate::DomainError::InvalidId {
                        id_type: stringify!($Name),
                        value:   s.to_string(),
                    }
                })
            }
        }
    };
}
