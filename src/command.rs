//! Builds the argument vector executed inside the cleanup pod.

/// Fixed removal verb and flag; everything after these is an operand.
pub const RM_COMMAND: [&str; 2] = ["rm", "-rf"];

/// Build the full command vector for a cleanup pod.
///
/// Each relative directory is appended as `mount_path + dir` — deliberate
/// string concatenation, not path joining. Callers own the separator:
/// directories that need one must already carry it.
///
/// An empty `relative_dirs` yields just the removal pair with no operands;
/// callers must not submit a job in that case.
pub fn cleanup_command(mount_path: &str, relative_dirs: &[String]) -> Vec<String> {
    let mut command: Vec<String> = RM_COMMAND.iter().map(|s| s.to_string()).collect();
    command.extend(relative_dirs.iter().map(|dir| format!("{mount_path}{dir}")));
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_removal_pair() {
        let command = cleanup_command("/projects", &["ws-1/src".to_string()]);
        assert_eq!(command[0], "rm");
        assert_eq!(command[1], "-rf");
    }

    #[test]
    fn one_operand_per_directory() {
        let dirs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let command = cleanup_command("/projects/", &dirs);
        assert_eq!(command.len(), 2 + dirs.len());
        assert_eq!(command[2], "/projects/a");
        assert_eq!(command[3], "/projects/b");
        assert_eq!(command[4], "/projects/c");
    }

    #[test]
    fn concatenates_without_normalizing() {
        // No separator is inserted between mount path and directory.
        let command = cleanup_command("/projects", &["ws-42".to_string()]);
        assert_eq!(command[2], "/projectsws-42");
    }

    #[test]
    fn empty_dirs_yield_bare_removal_command() {
        let command = cleanup_command("/projects", &[]);
        assert_eq!(command, vec!["rm".to_string(), "-rf".to_string()]);
    }
}
