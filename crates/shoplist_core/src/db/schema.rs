//! Declarative table registry for shopping-list storage.
//!
//! # Responsibility
//! - Describe every table, column and named constraint in one place.
//! - Render idempotent DDL consumed by the migration runner.
//!
//! # Invariants
//! - Every table carries the standard columns (`id`, `created_at`,
//!   `updated_at`, `deleted_at`) before its own columns.
//! - Check constraint names are stable; callers match on them.
//! - `TABLES` is ordered so that referenced tables come first.

/// Check constraint guarding `shopping_lists.name`.
pub const CHK_SHOPPING_LISTS_NAME: &str = "chk_shopping_lists_name";
/// Check constraint guarding `shopping_lists.creator`.
pub const CHK_SHOPPING_LISTS_CREATOR: &str = "chk_shopping_lists_creator";
/// Check constraint guarding `items.name`.
pub const CHK_ITEMS_NAME: &str = "chk_items_name";
/// Check constraint guarding `items.quantity`.
pub const CHK_ITEMS_QUANTITY: &str = "chk_items_quantity";
/// Check constraint guarding `stores.name`.
pub const CHK_STORES_NAME: &str = "chk_stores_name";

/// Storage class of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Real,
    Integer,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Integer => "INTEGER",
        }
    }
}

/// Named check constraint attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDef {
    pub name: &'static str,
    pub expr: &'static str,
}

/// Column-level foreign key target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub table: &'static str,
    pub column: &'static str,
}

/// One column declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Constant SQL default. Must stay constant so the column can be added
    /// to an existing table with `ALTER TABLE`.
    pub default: Option<&'static str>,
    pub check: Option<CheckDef>,
    pub references: Option<ForeignKeyDef>,
}

impl ColumnDef {
    /// Nullable column without default, check or reference.
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            primary_key: false,
            default: None,
            check: None,
            references: None,
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            nullable: false,
            ..self
        }
    }

    pub const fn default_value(self, expr: &'static str) -> Self {
        Self {
            default: Some(expr),
            ..self
        }
    }

    pub const fn check(self, name: &'static str, expr: &'static str) -> Self {
        Self {
            check: Some(CheckDef { name, expr }),
            ..self
        }
    }

    pub const fn references(self, table: &'static str, column: &'static str) -> Self {
        Self {
            references: Some(ForeignKeyDef { table, column }),
            ..self
        }
    }

    /// Renders the column definition as used inside `CREATE TABLE` and
    /// `ALTER TABLE ... ADD COLUMN`.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.ty.as_sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(check) = self.check {
            sql.push_str(&format!(" CONSTRAINT {} CHECK ({})", check.name, check.expr));
        }
        if let Some(target) = self.references {
            sql.push_str(&format!(" REFERENCES {}({})", target.table, target.column));
        }
        sql
    }
}

/// Secondary index declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl IndexDef {
    pub fn create_sql(&self, table: &str) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} ({});",
            self.name,
            self.columns.join(", ")
        )
    }
}

/// One table declaration. `columns` lists only the entity-specific columns;
/// the standard columns are prepended by [`TableDef::all_columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub indexes: &'static [IndexDef],
}

impl TableDef {
    /// Standard columns followed by entity-specific columns.
    pub fn all_columns(&self) -> impl Iterator<Item = &'static ColumnDef> {
        STANDARD_COLUMNS.iter().chain(self.columns.iter())
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.all_columns().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.all_columns().map(|column| column.name).collect()
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.all_columns()
            .filter_map(|column| column.check.map(|check| check.name))
            .collect()
    }

    /// Renders an idempotent `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_sql(&self) -> String {
        self.create_sql_as(self.name)
    }

    /// Renders this table's definition under another name, used as the
    /// target of a table rebuild.
    pub fn create_sql_as(&self, name: &str) -> String {
        let columns = self
            .all_columns()
            .map(|column| format!("    {}", column.to_sql()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {name} (\n{columns}\n);")
    }
}

/// Identifier, timestamps (epoch milliseconds) and soft-delete marker.
pub const STANDARD_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnType::Text).primary_key(),
    ColumnDef::new("created_at", ColumnType::Integer)
        .not_null()
        .default_value("0"),
    ColumnDef::new("updated_at", ColumnType::Integer)
        .not_null()
        .default_value("0"),
    ColumnDef::new("deleted_at", ColumnType::Integer),
];

pub const SHOPPING_LISTS: TableDef = TableDef {
    name: "shopping_lists",
    columns: &[
        ColumnDef::new("name", ColumnType::Text)
            .not_null()
            .check(CHK_SHOPPING_LISTS_NAME, "name <> ''"),
        ColumnDef::new("creator", ColumnType::Text)
            .not_null()
            .check(CHK_SHOPPING_LISTS_CREATOR, "creator <> ''"),
    ],
    indexes: &[IndexDef {
        name: "idx_shopping_lists_deleted_at",
        columns: &["deleted_at"],
    }],
};

pub const ITEMS: TableDef = TableDef {
    name: "items",
    columns: &[
        ColumnDef::new("name", ColumnType::Text)
            .not_null()
            .check(CHK_ITEMS_NAME, "name <> ''"),
        ColumnDef::new("quantity", ColumnType::Real)
            .not_null()
            .check(CHK_ITEMS_QUANTITY, "quantity >= 0.0"),
        ColumnDef::new("uom", ColumnType::Text),
        ColumnDef::new("shopping_list_id", ColumnType::Text).references("shopping_lists", "id"),
    ],
    indexes: &[
        IndexDef {
            name: "idx_items_deleted_at",
            columns: &["deleted_at"],
        },
        IndexDef {
            name: "idx_items_shopping_list_id",
            columns: &["shopping_list_id"],
        },
    ],
};

pub const STORES: TableDef = TableDef {
    name: "stores",
    columns: &[
        ColumnDef::new("name", ColumnType::Text)
            .not_null()
            .check(CHK_STORES_NAME, "name <> ''"),
        ColumnDef::new("address", ColumnType::Text),
        ColumnDef::new("item_id", ColumnType::Text).references("items", "id"),
    ],
    indexes: &[
        IndexDef {
            name: "idx_stores_deleted_at",
            columns: &["deleted_at"],
        },
        IndexDef {
            name: "idx_stores_item_id",
            columns: &["item_id"],
        },
    ],
};

/// All managed tables, referenced tables first.
pub const TABLES: &[TableDef] = &[SHOPPING_LISTS, ITEMS, STORES];
