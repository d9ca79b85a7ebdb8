/*
 * In-Memory File System
 *
 * A tree of directories rooted at "root". Each directory holds files and
 * subdirectories in two separate, sorted namespaces.
 *
 * Files carry:
 * - Content (a string)
 * - An owner (user or admin)
 * - An encrypted flag; encrypted files can be neither read nor written
 * - Separate rwx permission bits for the user and for the admin
 *
 * The file system tracks a current directory and a current user. Reads and
 * writes are checked against the current user's permission bits. Nothing is
 * persisted.
 */

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use bitflags::bitflags;

bitflags! {
    /// Per-user file permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

impl FromStr for Permissions {
    type Err = FsError;

    /// Parse "rwx"-style strings; '-' is a placeholder, empty means rwx
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Permissions::all());
        }
        s.chars().try_fold(Permissions::empty(), |perms, c| match c {
            'r' => Ok(perms | Permissions::READ),
            'w' => Ok(perms | Permissions::WRITE),
            'x' => Ok(perms | Permissions::EXEC),
            '-' => Ok(perms),
            _ => Err(FsError::InvalidPermissions(s.to_string())),
        })
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |flag: Permissions, c: char| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(Permissions::READ, 'r'),
            bit(Permissions::WRITE, 'w'),
            bit(Permissions::EXEC, 'x')
        )
    }
}

/// The two simulated users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum User {
    User,
    Admin,
}

impl FromStr for User {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(User::User),
            "admin" => Ok(User::Admin),
            _ => Err(FsError::InvalidUser(s.to_string())),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            User::User => "user",
            User::Admin => "admin",
        })
    }
}

/// File system errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    AlreadyExists(String),
    NotFound(String),
    PermissionDenied,
    Encrypted,
    /// `cd ..` in the root directory
    AtRoot,
    InvalidUser(String),
    InvalidPermissions(String),
    InvalidName(String),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::AlreadyExists(name) => write!(f, "'{}' already exists", name),
            FsError::NotFound(name) => write!(f, "'{}' does not exist", name),
            FsError::PermissionDenied => write!(f, "Permission denied"),
            FsError::Encrypted => write!(f, "File is encrypted"),
            FsError::AtRoot => write!(f, "Already at root directory"),
            FsError::InvalidUser(u) => write!(f, "Invalid user '{}' (expected user/admin)", u),
            FsError::InvalidPermissions(p) => write!(f, "Invalid permissions '{}'", p),
            FsError::InvalidName(n) => write!(f, "Invalid name '{}'", n),
        }
    }
}

impl std::error::Error for FsError {}

/// A regular file
#[derive(Debug, Clone)]
pub struct File {
    pub content: String,
    pub owner: User,
    pub encrypted: bool,
    pub user_perms: Permissions,
    pub admin_perms: Permissions,
}

impl File {
    pub fn permissions_for(&self, user: User) -> Permissions {
        match user {
            User::User => self.user_perms,
            User::Admin => self.admin_perms,
        }
    }

    fn read(&self, user: User) -> Result<&str, FsError> {
        if !self.permissions_for(user).contains(Permissions::READ) {
            return Err(FsError::PermissionDenied);
        }
        if self.encrypted {
            return Err(FsError::Encrypted);
        }
        Ok(&self.content)
    }

    fn write(&mut self, user: User, data: &str) -> Result<(), FsError> {
        if !self.permissions_for(user).contains(Permissions::WRITE) {
            return Err(FsError::PermissionDenied);
        }
        if self.encrypted {
            return Err(FsError::Encrypted);
        }
        self.content = data.to_string();
        Ok(())
    }
}

/// A directory
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub files: BTreeMap<String, File>,
    pub subdirs: BTreeMap<String, Directory>,
}

/// Names of the entries in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directories: {}", self.dirs.join(" "))?;
        writeln!(f, "Files: {}", self.files.join(" "))
    }
}

/// Name of the root directory, as shown in paths
pub const ROOT_NAME: &str = "root";

fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// The file system with its cursor (current directory and user)
#[derive(Debug, Clone)]
pub struct FileSystem {
    root: Directory,
    /// Path from the root to the current directory
    cwd: Vec<String>,
    user: User,
}

impl FileSystem {
    pub fn new() -> Self {
        Self {
            root: Directory::default(),
            cwd: Vec::new(),
            user: User::User,
        }
    }

    fn current(&self) -> Option<&Directory> {
        let mut dir = &self.root;
        for name in &self.cwd {
            dir = dir.subdirs.get(name)?;
        }
        Some(dir)
    }

    fn current_mut(&mut self) -> Option<&mut Directory> {
        let mut dir = &mut self.root;
        for name in &self.cwd {
            dir = dir.subdirs.get_mut(name)?;
        }
        Some(dir)
    }

    fn cwd_dir(&self) -> Result<&Directory, FsError> {
        self.current().ok_or_else(|| FsError::NotFound(self.pwd()))
    }

    fn cwd_dir_mut(&mut self) -> Result<&mut Directory, FsError> {
        let pwd = self.pwd();
        self.current_mut().ok_or(FsError::NotFound(pwd))
    }

    fn file_mut(&mut self, name: &str) -> Result<&mut File, FsError> {
        self.cwd_dir_mut()?
            .files
            .get_mut(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Create an empty file in the current directory
    pub fn create_file(
        &mut self,
        name: &str,
        owner: User,
        encrypted: bool,
        user_perms: Permissions,
        admin_perms: Permissions,
    ) -> Result<(), FsError> {
        validate_name(name)?;
        let dir = self.cwd_dir_mut()?;
        if dir.files.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        dir.files.insert(
            name.to_string(),
            File {
                content: String::new(),
                owner,
                encrypted,
                user_perms,
                admin_perms,
            },
        );
        log::debug!("File '{}' created", name);
        Ok(())
    }

    /// Replace a file's content as the current user
    pub fn write_file(&mut self, name: &str, data: &str) -> Result<(), FsError> {
        let user = self.user;
        self.file_mut(name)?.write(user, data)?;
        log::debug!("Written {} byte(s) to '{}'", data.len(), name);
        Ok(())
    }

    /// Read a file's content as the current user
    pub fn read_file(&self, name: &str) -> Result<String, FsError> {
        let file = self
            .cwd_dir()?
            .files
            .get(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        file.read(self.user).map(str::to_string)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<(), FsError> {
        self.cwd_dir_mut()?
            .files
            .remove(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        log::debug!("File '{}' deleted", name);
        Ok(())
    }

    pub fn create_dir(&mut self, name: &str) -> Result<(), FsError> {
        validate_name(name)?;
        let dir = self.cwd_dir_mut()?;
        if dir.subdirs.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        dir.subdirs.insert(name.to_string(), Directory::default());
        log::debug!("Directory '{}' created", name);
        Ok(())
    }

    /// Enter a subdirectory, or the parent with ".."
    pub fn change_dir(&mut self, name: &str) -> Result<(), FsError> {
        if name == ".." {
            return self.cwd.pop().map(|_| ()).ok_or(FsError::AtRoot);
        }
        if !self.cwd_dir()?.subdirs.contains_key(name) {
            return Err(FsError::NotFound(name.to_string()));
        }
        self.cwd.push(name.to_string());
        Ok(())
    }

    /// Entries of the current directory, sorted by name
    pub fn list(&self) -> Result<Listing, FsError> {
        let dir = self.cwd_dir()?;
        Ok(Listing {
            dirs: dir.subdirs.keys().cloned().collect(),
            files: dir.files.keys().cloned().collect(),
        })
    }

    pub fn user(&self) -> User {
        self.user
    }

    pub fn set_user(&mut self, name: &str) -> Result<User, FsError> {
        self.user = name.parse()?;
        log::info!("Current user set to {}", self.user);
        Ok(self.user)
    }

    /// Absolute path of the current directory
    pub fn pwd(&self) -> String {
        let mut path = format!("/{}", ROOT_NAME);
        for name in &self.cwd {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Absolute paths of every file named `name`, depth-first from the root
    pub fn search(&self, name: &str) -> Vec<String> {
        fn walk(dir: &Directory, path: &str, name: &str, found: &mut Vec<String>) {
            if dir.files.contains_key(name) {
                found.push(format!("{}/{}", path, name));
            }
            for (sub_name, sub) in &dir.subdirs {
                walk(sub, &format!("{}/{}", path, sub_name), name, found);
            }
        }

        let mut found = Vec::new();
        walk(&self.root, &format!("/{}", ROOT_NAME), name, &mut found);
        found
    }

    /// Indented rendering of the whole tree
    pub fn tree(&self) -> String {
        fn render(dir: &Directory, name: &str, prefix: &str, out: &mut String) {
            out.push_str(&format!("{}{}/\n", prefix, name));
            for file in dir.files.keys() {
                out.push_str(&format!("{}  {}\n", prefix, file));
            }
            let child_prefix = format!("{}  ", prefix);
            for (sub_name, sub) in &dir.subdirs {
                render(sub, sub_name, &child_prefix, out);
            }
        }

        let mut out = String::new();
        render(&self.root, ROOT_NAME, "", &mut out);
        out
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rwx() -> Permissions {
        Permissions::all()
    }

    #[test]
    fn test_permissions_parse() {
        assert_eq!("r-x".parse::<Permissions>(), Ok(Permissions::READ | Permissions::EXEC));
        assert_eq!("".parse::<Permissions>(), Ok(rwx()));
        assert_eq!("rw".parse::<Permissions>().map(|p| p.to_string()), Ok("rw-".to_string()));
        assert!(matches!("rwz".parse::<Permissions>(), Err(FsError::InvalidPermissions(_))));
    }

    #[test]
    fn test_file_lifecycle() {
        let mut fs = FileSystem::new();
        fs.create_file("notes", User::User, false, rwx(), rwx()).unwrap();
        assert_eq!(
            fs.create_file("notes", User::User, false, rwx(), rwx()),
            Err(FsError::AlreadyExists("notes".to_string()))
        );

        fs.write_file("notes", "hello").unwrap();
        assert_eq!(fs.read_file("notes").as_deref(), Ok("hello"));

        fs.delete_file("notes").unwrap();
        assert_eq!(fs.read_file("notes"), Err(FsError::NotFound("notes".to_string())));
    }

    #[test]
    fn test_permissions_follow_current_user() {
        let mut fs = FileSystem::new();
        fs.create_file("secret", User::Admin, false, Permissions::empty(), rwx())
            .unwrap();
        assert_eq!(fs.read_file("secret"), Err(FsError::PermissionDenied));
        assert_eq!(fs.write_file("secret", "x"), Err(FsError::PermissionDenied));

        fs.set_user("ADMIN").unwrap();
        fs.write_file("secret", "x").unwrap();
        assert_eq!(fs.read_file("secret").as_deref(), Ok("x"));
        assert!(matches!(fs.set_user("root"), Err(FsError::InvalidUser(_))));
        assert_eq!(fs.user(), User::Admin);
    }

    #[test]
    fn test_encrypted_file_refuses_access() {
        let mut fs = FileSystem::new();
        fs.create_file("vault", User::User, true, rwx(), rwx()).unwrap();
        assert_eq!(fs.read_file("vault"), Err(FsError::Encrypted));
        assert_eq!(fs.write_file("vault", "x"), Err(FsError::Encrypted));
    }

    #[test]
    fn test_directories_and_search() {
        let mut fs = FileSystem::new();
        assert_eq!(fs.change_dir(".."), Err(FsError::AtRoot));

        fs.create_file("a.txt", User::User, false, rwx(), rwx()).unwrap();
        fs.create_dir("docs").unwrap();
        fs.change_dir("docs").unwrap();
        fs.create_dir("old").unwrap();
        fs.create_file("a.txt", User::User, false, rwx(), rwx()).unwrap();
        fs.change_dir("old").unwrap();
        fs.create_file("a.txt", User::User, false, rwx(), rwx()).unwrap();
        assert_eq!(fs.pwd(), "/root/docs/old");

        fs.change_dir("..").unwrap();
        assert_eq!(
            fs.list().unwrap(),
            Listing {
                dirs: vec!["old".to_string()],
                files: vec!["a.txt".to_string()],
            }
        );
        assert_eq!(fs.change_dir("nope"), Err(FsError::NotFound("nope".to_string())));
        assert_eq!(
            fs.search("a.txt"),
            vec!["/root/a.txt", "/root/docs/a.txt", "/root/docs/old/a.txt"]
        );
        assert_eq!(fs.tree(), "root/\n  a.txt\n  docs/\n    a.txt\n    old/\n      a.txt\n");
        assert!(matches!(fs.create_dir("a/b"), Err(FsError::InvalidName(_))));
    }
}
