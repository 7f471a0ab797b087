//! Event and command registries shared between the router and registration.
//!
//! All three tables live behind one mutex so a command's callbacks and its
//! platform id change together. Readers copy out what they need (a list of
//! `Arc`s) and release the lock before dispatching.

use crate::platform::Snowflake;
use crate::script::{CapturedScope, ScriptFunction};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A user callback together with the scope it was registered from.
#[derive(Debug)]
pub struct RegisteredCallback {
    scope: Arc<CapturedScope>,
    function: ScriptFunction,
}

impl RegisteredCallback {
    #[must_use]
    pub const fn new(scope: Arc<CapturedScope>, function: ScriptFunction) -> Self {
        Self { scope, function }
    }

    #[must_use]
    pub fn scope(&self) -> &CapturedScope {
        &self.scope
    }

    #[must_use]
    pub const fn function(&self) -> &ScriptFunction {
        &self.function
    }
}

/// Outcome of looking up the callback for a command at a given depth.
#[derive(Debug, Clone)]
pub enum CommandSlot {
    /// No command registered under that name
    Unknown,
    /// The chain is shorter than the requested depth
    OutOfRange,
    /// The node at that depth declared no callback
    Empty,
    Callback(Arc<RegisteredCallback>),
}

/// Identifies one `insert_command` call so a later id assignment or rollback
/// cannot clobber a newer registration of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationTicket(u64);

/// Where a platform id landed in [`Registry::set_command_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAssignment {
    /// Stored on the registration that requested it
    Current,
    /// A newer registration of the same name replaced it meanwhile
    Superseded,
    /// The command was removed while its upsert was in flight
    Gone,
}

#[derive(Debug)]
struct CommandEntry {
    ticket: RegistrationTicket,
    callbacks: Vec<Option<Arc<RegisteredCallback>>>,
    id: Option<Snowflake>,
    /// The registration this one replaced, restored if this one's upsert fails
    displaced: Option<Box<CommandEntry>>,
    removing: bool,
}

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<String, Vec<Arc<RegisteredCallback>>>,
    commands: HashMap<String, CommandEntry>,
    next_ticket: u64,
}

#[derive(Debug, Default)]
pub struct Registry {
    tables: Mutex<Tables>,
}

fn find_displaced(
    slot: &mut Option<Box<CommandEntry>>,
    ticket: RegistrationTicket,
) -> Option<&mut CommandEntry> {
    let entry = slot.as_deref_mut()?;
    if entry.ticket == ticket {
        Some(entry)
    } else {
        find_displaced(&mut entry.displaced, ticket)
    }
}

/// Drops the registration `ticket` from a displaced chain, splicing in
/// whatever it had displaced itself.
fn unlink_displaced(slot: &mut Option<Box<CommandEntry>>, ticket: RegistrationTicket) -> bool {
    let Some(entry) = slot.as_mut() else {
        return false;
    };
    if entry.ticket != ticket {
        return unlink_displaced(&mut entry.displaced, ticket);
    }
    let displaced = entry.displaced.take();
    *slot = displaced;
    true
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for an event kind. Insertion order is dispatch order.
    pub fn add_event(&self, kind_name: &str, callback: RegisteredCallback) {
        self.tables
            .lock()
            .events
            .entry(kind_name.to_string())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Snapshot of the callbacks registered for an event kind.
    #[must_use]
    pub fn event_callbacks(&self, kind_name: &str) -> Vec<Arc<RegisteredCallback>> {
        self.tables
            .lock()
            .events
            .get(kind_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Installs the callback chain for a command.
    ///
    /// An existing registration of the same name is kept aside, together with
    /// its platform id, until the new one is confirmed or rolled back. The
    /// platform upserts by name, so the new entry starts out with the old id.
    pub fn insert_command(
        &self,
        name: &str,
        callbacks: Vec<Option<RegisteredCallback>>,
    ) -> RegistrationTicket {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        tables.next_ticket += 1;
        let ticket = RegistrationTicket(tables.next_ticket);

        let displaced = tables.commands.remove(name).map(Box::new);
        tables.commands.insert(
            name.to_string(),
            CommandEntry {
                ticket,
                callbacks: callbacks.into_iter().map(|cb| cb.map(Arc::new)).collect(),
                id: displaced.as_ref().and_then(|entry| entry.id),
                displaced,
                removing: false,
            },
        );
        ticket
    }

    /// Records the platform id returned for the registration `ticket`.
    pub fn set_command_id(&self, name: &str, ticket: RegistrationTicket, id: Snowflake) -> IdAssignment {
        let mut tables = self.tables.lock();
        let Some(entry) = tables.commands.get_mut(name) else {
            return IdAssignment::Gone;
        };
        if entry.ticket == ticket {
            entry.id = Some(id);
            entry.displaced = None;
            return IdAssignment::Current;
        }
        match find_displaced(&mut entry.displaced, ticket) {
            Some(older) => {
                older.id = Some(id);
                // Same name, same platform command
                entry.id.get_or_insert(id);
                IdAssignment::Superseded
            }
            None => IdAssignment::Gone,
        }
    }

    /// Undoes `insert_command`, putting back the registration it displaced.
    /// Returns false if `ticket` is no longer registered.
    pub fn rollback_command(&self, name: &str, ticket: RegistrationTicket) -> bool {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        let Some(entry) = tables.commands.get_mut(name) else {
            return false;
        };
        if entry.ticket != ticket {
            return unlink_displaced(&mut entry.displaced, ticket);
        }
        match entry.displaced.take() {
            Some(previous) => *entry = *previous,
            None => {
                tables.commands.remove(name);
            }
        }
        true
    }

    /// Looks up the callback for `depth` resolved options.
    #[must_use]
    pub fn command_slot(&self, name: &str, depth: usize) -> CommandSlot {
        let tables = self.tables.lock();
        let Some(entry) = tables.commands.get(name) else {
            return CommandSlot::Unknown;
        };
        match entry.callbacks.get(depth) {
            None => CommandSlot::OutOfRange,
            Some(None) => CommandSlot::Empty,
            Some(Some(callback)) => CommandSlot::Callback(Arc::clone(callback)),
        }
    }

    /// Marks a command as being removed and hands back its ticket and id.
    ///
    /// `None` if the command is not registered or a removal is already in
    /// flight. The entry keeps routing until [`Self::complete_removal`].
    pub fn begin_removal(&self, name: &str) -> Option<(RegistrationTicket, Option<Snowflake>)> {
        let mut tables = self.tables.lock();
        let entry = tables.commands.get_mut(name)?;
        if entry.removing {
            return None;
        }
        entry.removing = true;
        Some((entry.ticket, entry.id))
    }

    /// Drops a command whose platform delete succeeded (or that never had an
    /// id). A registration added meanwhile survives, minus the deleted id.
    pub fn complete_removal(&self, name: &str, ticket: RegistrationTicket, deleted: Option<Snowflake>) {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;
        let Some(entry) = tables.commands.get_mut(name) else {
            return;
        };
        if entry.ticket == ticket {
            tables.commands.remove(name);
            return;
        }
        unlink_displaced(&mut entry.displaced, ticket);
        if deleted.is_some() && entry.id == deleted {
            entry.id = None;
        }
    }

    /// Clears the removal mark after a failed platform delete, leaving the
    /// command registered with its id.
    pub fn abort_removal(&self, name: &str, ticket: RegistrationTicket) {
        let mut tables = self.tables.lock();
        if let Some(entry) = tables.commands.get_mut(name) {
            if entry.ticket == ticket {
                entry.removing = false;
            } else if let Some(older) = find_displaced(&mut entry.displaced, ticket) {
                older.removing = false;
            }
        }
    }

    #[must_use]
    pub fn command_id(&self, name: &str) -> Option<Snowflake> {
        self.tables
            .lock()
            .commands
            .get(name)
            .and_then(|entry| entry.id)
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().commands.keys().cloned().collect();
        names.sort();
        names
    }
}
