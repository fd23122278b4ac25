// src/workspace.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ValidationErrors};
use crate::forms::{MemberDraft, ProjectDraft, TaskDraft};
use crate::models::{
    new_entity_id, Entity, EntityKind, Member, Project, Task, TaskStatus,
};

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Persist(EntityKind),
}

/// Result of applying a transition: the value the caller asked for plus
/// the collections that must be written back.
#[derive(Debug)]
pub struct Transition<T> {
    pub value: T,
    pub effects: Vec<Effect>,
}

impl<T> Transition<T> {
    fn new(value: T, kinds: &[EntityKind]) -> Self {
        Transition {
            value,
            effects: kinds.iter().copied().map(Effect::Persist).collect(),
        }
    }
}

/// All collections of one scope, held for the duration of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub members: Vec<Member>,
}

fn position<K: Entity>(items: &[K], id: &str) -> AppResult<usize> {
    items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| AppError::NotFound(K::KIND, id.to_string()))
}

impl Workspace {
    pub fn project(&self, id: &str) -> AppResult<&Project> {
        Ok(&self.projects[position(&self.projects, id)?])
    }

    pub fn task(&self, id: &str) -> AppResult<&Task> {
        Ok(&self.tasks[position(&self.tasks, id)?])
    }

    pub fn member(&self, id: &str) -> AppResult<&Member> {
        Ok(&self.members[position(&self.members, id)?])
    }

    // ─── PROJECTS ──────────────────────────────────────────────────────────────

    /// New entries go to the front, as the dashboard lists newest first.
    pub fn create_project(&mut self, draft: ProjectDraft, now: DateTime<Utc>) -> Transition<Project> {
        let project = Project {
            id: new_entity_id(EntityKind::Projects),
            name: draft.name,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            color: draft.color,
            due_date: draft.due_date,
            created_at: now,
        };
        self.projects.insert(0, project.clone());
        Transition::new(project, &[EntityKind::Projects])
    }

    pub fn update_project(&mut self, id: &str, draft: ProjectDraft) -> AppResult<Transition<Project>> {
        let idx = position(&self.projects, id)?;
        let project = &mut self.projects[idx];
        project.name = draft.name;
        project.description = draft.description;
        project.status = draft.status;
        project.priority = draft.priority;
        project.color = draft.color;
        project.due_date = draft.due_date;
        Ok(Transition::new(project.clone(), &[EntityKind::Projects]))
    }

    /// Removes the project together with every task that belongs to it.
    pub fn delete_project(&mut self, id: &str) -> AppResult<Transition<Project>> {
        let idx = position(&self.projects, id)?;
        let removed = self.projects.remove(idx);
        let before = self.tasks.len();
        self.tasks.retain(|t| t.project_id.as_deref() != Some(id));
        if self.tasks.len() == before {
            return Ok(Transition::new(removed, &[EntityKind::Projects]));
        }
        Ok(Transition::new(removed, &[EntityKind::Projects, EntityKind::Tasks]))
    }

    // ─── TASKS ─────────────────────────────────────────────────────────────────

    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> AppResult<Transition<Task>> {
        self.check_references(&draft)?;
        let task = Task {
            id: new_entity_id(EntityKind::Tasks),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            assignee: draft.assignee,
            project_id: draft.project_id,
            due_date: draft.due_date,
            created_at: now,
        };
        self.tasks.insert(0, task.clone());
        Ok(Transition::new(task, &[EntityKind::Tasks]))
    }

    pub fn update_task(&mut self, id: &str, draft: TaskDraft) -> AppResult<Transition<Task>> {
        let idx = position(&self.tasks, id)?;
        self.check_references(&draft)?;
        let task = &mut self.tasks[idx];
        task.title = draft.title;
        task.description = draft.description;
        task.status = draft.status;
        task.priority = draft.priority;
        task.assignee = draft.assignee;
        task.project_id = draft.project_id;
        task.due_date = draft.due_date;
        Ok(Transition::new(task.clone(), &[EntityKind::Tasks]))
    }

    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) -> AppResult<Transition<Task>> {
        let idx = position(&self.tasks, id)?;
        let task = &mut self.tasks[idx];
        task.status = status;
        Ok(Transition::new(task.clone(), &[EntityKind::Tasks]))
    }

    pub fn delete_task(&mut self, id: &str) -> AppResult<Transition<Task>> {
        let idx = position(&self.tasks, id)?;
        let removed = self.tasks.remove(idx);
        Ok(Transition::new(removed, &[EntityKind::Tasks]))
    }

    // ─── MEMBERS ───────────────────────────────────────────────────────────────

    pub fn create_member(&mut self, draft: MemberDraft, now: DateTime<Utc>) -> Transition<Member> {
        let member = Member {
            id: new_entity_id(EntityKind::Members),
            name: draft.name,
            email: draft.email,
            role: draft.role,
            created_at: now,
        };
        self.members.insert(0, member.clone());
        Transition::new(member, &[EntityKind::Members])
    }

    pub fn update_member(&mut self, id: &str, draft: MemberDraft) -> AppResult<Transition<Member>> {
        let idx = position(&self.members, id)?;
        let member = &mut self.members[idx];
        member.name = draft.name;
        member.email = draft.email;
        member.role = draft.role;
        Ok(Transition::new(member.clone(), &[EntityKind::Members]))
    }

    /// Removes the member and unassigns their tasks.
    pub fn delete_member(&mut self, id: &str) -> AppResult<Transition<Member>> {
        let idx = position(&self.members, id)?;
        let removed = self.members.remove(idx);
        let mut touched = false;
        for task in self.tasks.iter_mut().filter(|t| t.assignee.as_deref() == Some(id)) {
            task.assignee = None;
            touched = true;
        }
        if touched {
            Ok(Transition::new(removed, &[EntityKind::Members, EntityKind::Tasks]))
        } else {
            Ok(Transition::new(removed, &[EntityKind::Members]))
        }
    }

    // ─── IMPORT ────────────────────────────────────────────────────────────────

    /// Rejects duplicate ids, then nulls references that point nowhere.
    /// Returns how many references were cleared.
    pub fn sanitize_for_import(&mut self) -> AppResult<usize> {
        ensure_unique_ids(&self.projects)?;
        ensure_unique_ids(&self.tasks)?;
        ensure_unique_ids(&self.members)?;

        let mut cleared = 0;
        for task in &mut self.tasks {
            if let Some(pid) = &task.project_id {
                if !self.projects.iter().any(|p| &p.id == pid) {
                    task.project_id = None;
                    cleared += 1;
                }
            }
            if let Some(mid) = &task.assignee {
                if !self.members.iter().any(|m| &m.id == mid) {
                    task.assignee = None;
                    cleared += 1;
                }
            }
        }
        Ok(cleared)
    }

    fn check_references(&self, draft: &TaskDraft) -> AppResult<()> {
        let mut errors = ValidationErrors::new();
        if let Some(pid) = &draft.project_id {
            if !self.projects.iter().any(|p| &p.id == pid) {
                errors.add("projectId", "Unknown project");
            }
        }
        if let Some(mid) = &draft.assignee {
            if !self.members.iter().any(|m| &m.id == mid) {
                errors.add("assignee", "Unknown team member");
            }
        }
        errors.finish(())
    }
}

fn ensure_unique_ids<K: Entity>(items: &[K]) -> AppResult<()> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if item.id().is_empty() {
            return Err(AppError::InvalidImport(format!("{} entry with empty id", K::KIND)));
        }
        if !seen.insert(item.id()) {
            return Err(AppError::InvalidImport(format!(
                "duplicate {} id {}",
                K::KIND,
                item.id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus};
    use chrono::NaiveDate;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn project_draft(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: name.to_string(),
            description: String::new(),
            status: ProjectStatus::Planning,
            priority: Priority::High,
            color: "#36b37e".to_string(),
            due_date: due(),
        }
    }

    fn task_draft(title: &str, project_id: Option<&str>, assignee: Option<&str>) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            assignee: assignee.map(String::from),
            project_id: project_id.map(String::from),
            due_date: due(),
        }
    }

    fn member_draft(name: &str) -> MemberDraft {
        MemberDraft {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: "Developer".to_string(),
        }
    }

    #[test]
    fn create_prepends_and_requests_persist() {
        let mut ws = Workspace::default();
        let first = ws.create_project(project_draft("One"), Utc::now()).value;
        let second = ws.create_project(project_draft("Two"), Utc::now());
        assert_eq!(second.effects, vec![Effect::Persist(EntityKind::Projects)]);
        assert_eq!(ws.projects[0].id, second.value.id);
        assert_eq!(ws.projects[1].id, first.id);
    }

    #[test]
    fn update_keeps_id_and_created_at() {
        let mut ws = Workspace::default();
        let created = ws.create_project(project_draft("One"), Utc::now()).value;
        let mut draft = project_draft("Renamed");
        draft.status = ProjectStatus::Completed;
        let updated = ws.update_project(&created.id, draft).unwrap().value;
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(ws.projects[0].status, ProjectStatus::Completed);
    }

    #[test]
    fn deleting_project_removes_its_tasks() {
        let mut ws = Workspace::default();
        let keep = ws.create_project(project_draft("Keep"), Utc::now()).value;
        let doomed = ws.create_project(project_draft("Doomed"), Utc::now()).value;
        ws.create_task(task_draft("a", Some(&doomed.id), None), Utc::now()).unwrap();
        ws.create_task(task_draft("b", Some(&keep.id), None), Utc::now()).unwrap();
        ws.create_task(task_draft("c", None, None), Utc::now()).unwrap();

        let t = ws.delete_project(&doomed.id).unwrap();
        assert_eq!(
            t.effects,
            vec![Effect::Persist(EntityKind::Projects), Effect::Persist(EntityKind::Tasks)]
        );
        assert_eq!(ws.tasks.len(), 2);
        assert!(ws
            .tasks
            .iter()
            .all(|t| t.project_id.as_ref().map_or(true, |p| ws.projects.iter().any(|x| &x.id == p))));
    }

    #[test]
    fn deleting_member_unassigns_tasks() {
        let mut ws = Workspace::default();
        let alice = ws.create_member(member_draft("Alice"), Utc::now()).value;
        let task = ws
            .create_task(task_draft("a", None, Some(&alice.id)), Utc::now())
            .unwrap()
            .value;
        let t = ws.delete_member(&alice.id).unwrap();
        assert!(t.effects.contains(&Effect::Persist(EntityKind::Tasks)));
        assert_eq!(ws.task(&task.id).unwrap().assignee, None);
    }

    #[test]
    fn task_with_unknown_reference_is_rejected() {
        let mut ws = Workspace::default();
        let err = ws
            .create_task(task_draft("a", Some("p_missing"), None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(e) if e.get("projectId").is_some()));
        assert!(ws.tasks.is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut ws = Workspace::default();
        assert!(matches!(
            ws.delete_task("t_nope"),
            Err(AppError::NotFound(EntityKind::Tasks, _))
        ));
        assert!(matches!(
            ws.set_task_status("t_nope", TaskStatus::Done),
            Err(AppError::NotFound(EntityKind::Tasks, _))
        ));
    }

    #[test]
    fn import_sanitizing_clears_dangling_refs_and_rejects_duplicates() {
        let mut ws = Workspace {
            projects: Project::sample(),
            tasks: Task::sample(),
            members: Vec::new(),
        };
        // all four sample tasks point at sample members, which are absent
        assert_eq!(ws.sanitize_for_import().unwrap(), 4);
        assert!(ws.tasks.iter().all(|t| t.assignee.is_none()));

        let mut dup = Workspace {
            projects: vec![Project::sample()[0].clone(), Project::sample()[0].clone()],
            ..Default::default()
        };
        assert!(matches!(dup.sanitize_for_import(), Err(AppError::InvalidImport(_))));
    }
}
