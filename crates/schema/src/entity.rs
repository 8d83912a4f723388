//! Static entity descriptors.
//!
//! Every entity declares its table name, primary-key column and kind, the
//! whitelist of mutable fields, and its outgoing foreign keys with a delete
//! policy. Generic CRUD consults these descriptors instead of carrying
//! per-entity code.

/// The entities of the roster data model.
///
/// The discriminant indexes [`DESCRIPTORS`]; keep the two in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    /// Account shared by every kind of person in the system.
    User,
    /// Company-side account, shadow row of a [`Entity::User`].
    Employee,
    /// University-side account, shadow row of a [`Entity::User`].
    UtdPersonnel,
    /// Student, shadow row of a [`Entity::UtdPersonnel`].
    Student,
    /// Faculty member, shadow row of a [`Entity::UtdPersonnel`].
    Faculty,
    /// Shared id namespace for teams and faculty, so a `tid` is unique
    /// across both. Faculty-owned rows carry the owning `fuid`.
    TeamSpace,
    Company,
    Project,
    Team,
    /// Per-team ranked project preferences, six fixed slots.
    Choice,
    HelpTicket,
    Invite,
    /// Join record: one required skill of a project.
    ProjectSkill,
    /// Join record: one skill of a student.
    StudentSkill,
}

impl Entity {
    /// Every entity, in descriptor order.
    pub const ALL: [Entity; 14] = [
        Entity::User,
        Entity::Employee,
        Entity::UtdPersonnel,
        Entity::Student,
        Entity::Faculty,
        Entity::TeamSpace,
        Entity::Company,
        Entity::Project,
        Entity::Team,
        Entity::Choice,
        Entity::HelpTicket,
        Entity::Invite,
        Entity::ProjectSkill,
        Entity::StudentSkill,
    ];

    /// The static descriptor for this entity.
    pub fn descriptor(self) -> &'static EntityDescriptor {
        &DESCRIPTORS[self as usize]
    }

    /// The SQL table name for this entity.
    pub fn table(self) -> &'static str {
        self.descriptor().table
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Storage kind of a column or primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
}

/// Action applied to a referencing row when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Null out the referencing field, keep the row.
    SetNull,
    /// Delete the referencing row, transitively.
    Cascade,
    /// Refuse the whole delete.
    Restrict,
}

/// One whitelisted field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// One outgoing foreign key. `field` may equal the primary-key column for
/// shadow-row entities (the pk doubles as the reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub references: Entity,
    pub on_delete: DeletePolicy,
}

/// Static description of one entity's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub entity: Entity,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub key_kind: FieldKind,
    pub fields: &'static [FieldDef],
    pub foreign_keys: &'static [ForeignKey],
}

impl EntityDescriptor {
    /// Look up a whitelisted field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a whitelisted (mutable) field of this entity.
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

const fn field(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, kind }
}

const fn fk(field: &'static str, references: Entity, on_delete: DeletePolicy) -> ForeignKey {
    ForeignKey { field, references, on_delete }
}

use DeletePolicy::{Cascade, Restrict, SetNull};
use FieldKind::{Bool, Float, Int, Text, Timestamp};

/// The one declarative table both backends consume, indexed by
/// [`Entity`] discriminant.
pub static DESCRIPTORS: [EntityDescriptor; 14] = [
    EntityDescriptor {
        entity: Entity::User,
        table: "users",
        primary_key: "uid",
        key_kind: Int,
        fields: &[
            field("first_name", Text),
            field("last_name", Text),
            field("email", Text),
            field("address", Text),
            field("is_utd", Bool),
            field("is_employee", Bool),
        ],
        foreign_keys: &[],
    },
    EntityDescriptor {
        entity: Entity::Employee,
        table: "employees",
        primary_key: "euid",
        key_kind: Int,
        fields: &[field("works_at", Text), field("password", Text)],
        foreign_keys: &[
            fk("euid", Entity::User, Cascade),
            fk("works_at", Entity::Company, Restrict),
        ],
    },
    EntityDescriptor {
        entity: Entity::UtdPersonnel,
        table: "utd_personnel",
        primary_key: "uid",
        key_kind: Int,
        fields: &[
            field("u_type", Text),
            field("net_id", Text),
            field("is_admin", Bool),
        ],
        foreign_keys: &[fk("uid", Entity::User, Cascade)],
    },
    EntityDescriptor {
        entity: Entity::Student,
        table: "students",
        primary_key: "suid",
        key_kind: Int,
        fields: &[
            field("major", Text),
            field("year", Int),
            field("member_of", Int),
        ],
        foreign_keys: &[
            fk("suid", Entity::UtdPersonnel, Cascade),
            fk("member_of", Entity::Team, SetNull),
        ],
    },
    EntityDescriptor {
        entity: Entity::Faculty,
        table: "faculty",
        primary_key: "fuid",
        key_kind: Int,
        fields: &[field("tid", Int)],
        foreign_keys: &[
            fk("fuid", Entity::UtdPersonnel, Cascade),
            fk("tid", Entity::TeamSpace, SetNull),
        ],
    },
    EntityDescriptor {
        entity: Entity::TeamSpace,
        table: "team_space",
        primary_key: "tid",
        key_kind: Int,
        fields: &[field("fuid", Int)],
        foreign_keys: &[fk("fuid", Entity::Faculty, Cascade)],
    },
    EntityDescriptor {
        entity: Entity::Company,
        table: "companies",
        primary_key: "name",
        key_kind: Text,
        fields: &[field("address", Text), field("logo", Text)],
        foreign_keys: &[],
    },
    EntityDescriptor {
        entity: Entity::Project,
        table: "projects",
        primary_key: "pid",
        key_kind: Int,
        fields: &[
            field("company", Text),
            field("advisor", Int),
            field("mentor", Int),
            field("sponsor", Int),
            field("title", Text),
            field("description", Text),
            field("status", Text),
            field("video", Text),
        ],
        foreign_keys: &[
            fk("company", Entity::Company, Cascade),
            fk("advisor", Entity::Faculty, SetNull),
            fk("mentor", Entity::Employee, SetNull),
            fk("sponsor", Entity::Employee, SetNull),
        ],
    },
    EntityDescriptor {
        entity: Entity::Team,
        table: "teams",
        primary_key: "tid",
        key_kind: Int,
        fields: &[
            field("assigned_proj", Int),
            field("leader", Int),
            field("name", Text),
            field("comments", Text),
            field("budget", Float),
        ],
        foreign_keys: &[
            fk("tid", Entity::TeamSpace, Cascade),
            fk("assigned_proj", Entity::Project, SetNull),
            fk("leader", Entity::Student, SetNull),
        ],
    },
    EntityDescriptor {
        entity: Entity::Choice,
        table: "choices",
        primary_key: "tid",
        key_kind: Int,
        fields: &[
            field("choice1", Int),
            field("choice2", Int),
            field("choice3", Int),
            field("choice4", Int),
            field("choice5", Int),
            field("choice6", Int),
        ],
        foreign_keys: &[
            fk("tid", Entity::Team, Cascade),
            fk("choice1", Entity::Project, SetNull),
            fk("choice2", Entity::Project, SetNull),
            fk("choice3", Entity::Project, SetNull),
            fk("choice4", Entity::Project, SetNull),
            fk("choice5", Entity::Project, SetNull),
            fk("choice6", Entity::Project, SetNull),
        ],
    },
    EntityDescriptor {
        entity: Entity::HelpTicket,
        table: "help_tickets",
        primary_key: "hid",
        key_kind: Int,
        fields: &[
            field("h_status", Text),
            field("h_description", Text),
            field("requestor", Int),
        ],
        foreign_keys: &[fk("requestor", Entity::User, Cascade)],
    },
    EntityDescriptor {
        entity: Entity::Invite,
        table: "invites",
        primary_key: "inv_id",
        key_kind: Int,
        fields: &[
            field("uid", Int),
            field("team_id", Int),
            field("expiration", Timestamp),
        ],
        foreign_keys: &[
            fk("uid", Entity::User, Cascade),
            fk("team_id", Entity::Team, Cascade),
        ],
    },
    EntityDescriptor {
        entity: Entity::ProjectSkill,
        table: "project_skills",
        primary_key: "id",
        key_kind: Text,
        fields: &[field("pid", Int), field("skill_name", Text)],
        foreign_keys: &[fk("pid", Entity::Project, Cascade)],
    },
    EntityDescriptor {
        entity: Entity::StudentSkill,
        table: "student_skills",
        primary_key: "id",
        key_kind: Text,
        fields: &[field("suid", Int), field("skill_name", Text)],
        foreign_keys: &[fk("suid", Entity::Student, Cascade)],
    },
];
