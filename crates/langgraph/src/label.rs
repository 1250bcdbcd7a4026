use std::fmt;

/// 图中节点的标签
pub trait GraphLabel: Send + Sync + 'static {
    fn as_str(&self) -> &'static str;

    fn intern(&self) -> InternedGraphLabel {
        InternedGraphLabel(self.as_str())
    }
}

/// 标签的可复制形式，用作节点表和边表的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedGraphLabel(&'static str);

impl InternedGraphLabel {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for InternedGraphLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl GraphLabel for InternedGraphLabel {
    fn as_str(&self) -> &'static str {
        self.0
    }
}

/// 定义一个实现了 [`GraphLabel`] 的枚举，标签名为 `枚举名::变体名`
#[macro_export]
macro_rules! graph_label {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::label::GraphLabel for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => concat!(stringify!($name), "::", stringify!($variant))),+
                }
            }
        }
    };
}

graph_label! {
    /// 所有图共享的起止标签
    pub enum BaseAgentLabel {
        Start,
        End,
    }
}
