//! Top-level item syntax: procedures, records, enums, modals, classes,
//! static bindings, and `using` declarations (C4/C9).

use super::{Binding, Block, Ident, Path, TypeExpr};
use cursive0_base::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Private,
    Internal,
    Protected,
    Public,
}

/// The receiver permission sigil a method is declared with: `~` const,
/// `~!` unique, `~%` shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverPerm {
    Const,
    Unique,
    Shared,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub mode: Option<super::ParamMode>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: Ident,
    pub visibility: Visibility,
    pub receiver: Option<ReceiverPerm>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
    pub default: Option<super::Expr>,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub name: Ident,
    pub visibility: Visibility,
    pub fields: Vec<Field>,
    pub methods: Vec<Procedure>,
    pub implements: Vec<Path>,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: Ident,
    pub payload: Vec<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub name: Ident,
    pub visibility: Visibility,
    pub variants: Vec<EnumVariant>,
    pub methods: Vec<Procedure>,
    pub implements: Vec<Path>,
}

/// One named state of a `modal`: its own fields, methods, and transitions.
#[derive(Debug, Clone)]
pub struct ModalState {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub methods: Vec<Procedure>,
    pub transitions: Vec<Transition>,
}

/// A `transition` declaration: constructs the target state from `~!self`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub name: Ident,
    pub target_state: Ident,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Modal {
    pub name: Ident,
    pub visibility: Visibility,
    pub states: Vec<ModalState>,
    pub implements: Vec<Path>,
}

#[derive(Debug, Clone)]
pub struct ClassMethod {
    pub name: Ident,
    pub receiver: ReceiverPerm,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    /// `Some` for a default (provided) implementation.
    pub default_body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: Ident,
    pub visibility: Visibility,
    pub methods: Vec<ClassMethod>,
}

#[derive(Debug, Clone)]
pub struct StaticDecl {
    pub visibility: Visibility,
    pub binding: Binding,
}

#[derive(Debug, Clone)]
pub struct UsingRename {
    pub path: Path,
    pub alias: Option<Ident>,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Procedure(Procedure),
    Record(Record),
    Enum(Enum),
    Modal(Modal),
    Class(Class),
    Static(StaticDecl),
    Using(UsingRename),
    UsingMany(Path, Vec<UsingRename>),
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}
