//! Shell commands over the file-system session.

use berry_vfs::error::{BerryError, FsError, Result};
use berry_vfs::{Node, NodeId, WindowKind};

use crate::shell::{Command, CommandOutput, CommandRegistry, Environment};

/// Register every file-system command.
pub fn register_all(reg: &mut CommandRegistry) {
    reg.register(Box::new(LsCmd));
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(BackCmd));
    reg.register(Box::new(ForwardCmd));
    reg.register(Box::new(UpCmd));
    reg.register(Box::new(TreeCmd));
    reg.register(Box::new(MkdirCmd));
    reg.register(Box::new(TouchCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(WriteCmd));
    reg.register(Box::new(RenameCmd));
    reg.register(Box::new(RmCmd));
    reg.register(Box::new(MvCmd));
    reg.register(Box::new(CpCmd));
    reg.register(Box::new(CopyCmd));
    reg.register(Box::new(CutCmd));
    reg.register(Box::new(PasteCmd));
    reg.register(Box::new(OpenCmd));
    reg.register(Box::new(WindowsCmd));
    reg.register(Box::new(CloseCmd));
    reg.register(Box::new(SaveCmd));
    reg.register(Box::new(ExitCmd));
}

fn usage_error(cmd: &dyn Command) -> BerryError {
    BerryError::Command(format!("usage: {}", cmd.usage()))
}

fn type_label(node: &Node) -> &'static str {
    if node.is_folder() { "dir" } else { "file" }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List a folder"
    }
    fn usage(&self) -> &str {
        "ls [path]"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let folder = match args.first() {
            Some(path) => env.lookup(path)?,
            None => env.cwd(),
        };
        let rows: Vec<Vec<String>> = env
            .session
            .tree()
            .children(&folder)?
            .iter()
            .map(|n| {
                let size = n.content().map(|c| c.len().to_string()).unwrap_or_default();
                vec![type_label(n).to_string(), n.name().to_string(), size]
            })
            .collect();
        if rows.is_empty() {
            return Ok(CommandOutput::Text("(empty)".to_string()));
        }
        Ok(CommandOutput::Table {
            headers: vec!["Type".into(), "Name".into(), "Size".into()],
            rows,
        })
    }
}

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change folder"
    }
    fn usage(&self) -> &str {
        "cd [path]"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let target = match args.first() {
            Some(path) => env.lookup(path)?,
            None => NodeId::root(),
        };
        env.session.navigate(env.window, &target)?;
        Ok(CommandOutput::None)
    }
}

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print the current folder"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(env.cwd_path()))
    }
}

struct BackCmd;
impl Command for BackCmd {
    fn name(&self) -> &str {
        "back"
    }
    fn description(&self) -> &str {
        "Go back in folder history"
    }
    fn usage(&self) -> &str {
        "back"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if env.session.back(env.window) {
            Ok(CommandOutput::Text(env.cwd_path()))
        } else {
            Ok(CommandOutput::Text("already at oldest folder".to_string()))
        }
    }
}

struct ForwardCmd;
impl Command for ForwardCmd {
    fn name(&self) -> &str {
        "forward"
    }
    fn description(&self) -> &str {
        "Go forward in folder history"
    }
    fn usage(&self) -> &str {
        "forward"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if env.session.forward(env.window) {
            Ok(CommandOutput::Text(env.cwd_path()))
        } else {
            Ok(CommandOutput::Text("already at newest folder".to_string()))
        }
    }
}

struct UpCmd;
impl Command for UpCmd {
    fn name(&self) -> &str {
        "up"
    }
    fn description(&self) -> &str {
        "Go to the parent folder"
    }
    fn usage(&self) -> &str {
        "up"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        env.session.up(env.window);
        Ok(CommandOutput::Text(env.cwd_path()))
    }
}

struct TreeCmd;
impl Command for TreeCmd {
    fn name(&self) -> &str {
        "tree"
    }
    fn description(&self) -> &str {
        "Show a folder and everything below it"
    }
    fn usage(&self) -> &str {
        "tree [path]"
    }
    fn category(&self) -> &str {
        "navigation"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let start = match args.first() {
            Some(path) => env.lookup(path)?,
            None => env.cwd(),
        };
        let tree = env.session.tree();
        let top = tree.find_by_id(&start)?.node;
        let mut lines = vec![tree.path_of(&start)?];
        let mut stack: Vec<(&Node, usize)> = top.children().iter().rev().map(|n| (n, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            let suffix = if node.is_folder() { "/" } else { "" };
            lines.push(format!("{}{}{suffix}", "  ".repeat(depth), node.name()));
            stack.extend(node.children().iter().rev().map(|n| (n, depth + 1)));
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// Files and folders
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create a folder"
    }
    fn usage(&self) -> &str {
        "mkdir <path>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let (parent, name) = env.lookup_parent(path)?;
        env.session.create_folder(&parent, &name, env.now)?;
        Ok(CommandOutput::None)
    }
}

struct TouchCmd;
impl Command for TouchCmd {
    fn name(&self) -> &str {
        "touch"
    }
    fn description(&self) -> &str {
        "Create a file"
    }
    fn usage(&self) -> &str {
        "touch <path> [text...]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let (parent, name) = env.lookup_parent(path)?;
        let content = args[1..].join(" ");
        env.session
            .create_file(&parent, &name, &content, env.now)?;
        Ok(CommandOutput::None)
    }
}

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Print a file"
    }
    fn usage(&self) -> &str {
        "cat <path>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let id = env.lookup(path)?;
        let node = env.session.tree().find_by_id(&id)?.node;
        let content = node
            .content()
            .ok_or_else(|| FsError::NotAFile(node.name().to_string()))?;
        Ok(CommandOutput::Text(content.to_string()))
    }
}

struct WriteCmd;
impl Command for WriteCmd {
    fn name(&self) -> &str {
        "write"
    }
    fn description(&self) -> &str {
        "Replace a file's text, creating the file if needed"
    }
    fn usage(&self) -> &str {
        "write <path> <text...>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() < 2 {
            return Err(usage_error(self));
        }
        let text = args[1..].join(" ");
        match env.lookup(args[0]) {
            Ok(id) => env.session.save_file(&id, &text, env.now)?,
            Err(BerryError::Fs(FsError::NotFound(_))) => {
                let (parent, name) = env.lookup_parent(args[0])?;
                env.session.create_file(&parent, &name, &text, env.now)?;
            },
            Err(e) => return Err(e),
        }
        Ok(CommandOutput::Text(format!("Wrote {} bytes", text.len())))
    }
}

struct RenameCmd;
impl Command for RenameCmd {
    fn name(&self) -> &str {
        "rename"
    }
    fn description(&self) -> &str {
        "Rename a file or folder"
    }
    fn usage(&self) -> &str {
        "rename <path> <new name>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let [path, name] = args else {
            return Err(usage_error(self));
        };
        let id = env.lookup(path)?;
        match env.session.rename(&id, name, env.now) {
            // A blank name cancels the rename.
            Err(FsError::EmptyName) => Ok(CommandOutput::None),
            other => other.map(|()| CommandOutput::None).map_err(Into::into),
        }
    }
}

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Delete a file or folder and its contents"
    }
    fn usage(&self) -> &str {
        "rm <path>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let id = env.lookup(path)?;
        let removed = env.session.delete(&id, env.now)?;
        Ok(CommandOutput::Text(format!("{} item(s) removed", removed.len())))
    }
}

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move into another folder"
    }
    fn usage(&self) -> &str {
        "mv <path> <folder>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let [src, dest] = args else {
            return Err(usage_error(self));
        };
        let id = env.lookup(src)?;
        let dest = env.lookup(dest)?;
        env.session.move_node(&id, &dest, env.now)?;
        Ok(CommandOutput::None)
    }
}

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy into another folder"
    }
    fn usage(&self) -> &str {
        "cp <path> <folder>"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let [src, dest] = args else {
            return Err(usage_error(self));
        };
        let id = env.lookup(src)?;
        let dest = env.lookup(dest)?;
        env.session.copy_node(&id, &dest, env.now)?;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

struct CopyCmd;
impl Command for CopyCmd {
    fn name(&self) -> &str {
        "copy"
    }
    fn description(&self) -> &str {
        "Copy to the clipboard"
    }
    fn usage(&self) -> &str {
        "copy <path>"
    }
    fn category(&self) -> &str {
        "clipboard"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let id = env.lookup(path)?;
        env.session.copy(&id)?;
        Ok(CommandOutput::None)
    }
}

struct CutCmd;
impl Command for CutCmd {
    fn name(&self) -> &str {
        "cut"
    }
    fn description(&self) -> &str {
        "Cut to the clipboard"
    }
    fn usage(&self) -> &str {
        "cut <path>"
    }
    fn category(&self) -> &str {
        "clipboard"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let id = env.lookup(path)?;
        env.session.cut(&id)?;
        Ok(CommandOutput::None)
    }
}

struct PasteCmd;
impl Command for PasteCmd {
    fn name(&self) -> &str {
        "paste"
    }
    fn description(&self) -> &str {
        "Paste the clipboard into a folder"
    }
    fn usage(&self) -> &str {
        "paste [folder]"
    }
    fn category(&self) -> &str {
        "clipboard"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let dest = match args.first() {
            Some(path) => env.lookup(path)?,
            None => env.cwd(),
        };
        env.session.paste(&dest, env.now)?;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// Windows and session
// ---------------------------------------------------------------------------

struct OpenCmd;
impl Command for OpenCmd {
    fn name(&self) -> &str {
        "open"
    }
    fn description(&self) -> &str {
        "Open a window on a file or folder"
    }
    fn usage(&self) -> &str {
        "open <path>"
    }
    fn category(&self) -> &str {
        "windows"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| usage_error(self))?;
        let id = env.lookup(path)?;
        let is_folder = env.session.tree().find_by_id(&id)?.node.is_folder();
        let window = if is_folder {
            env.session.open_folder_window(&id)?
        } else {
            env.session.open_file_window(&id)?
        };
        Ok(CommandOutput::Text(format!("Opened {window}")))
    }
}

struct WindowsCmd;
impl Command for WindowsCmd {
    fn name(&self) -> &str {
        "windows"
    }
    fn description(&self) -> &str {
        "List open windows"
    }
    fn usage(&self) -> &str {
        "windows"
    }
    fn category(&self) -> &str {
        "windows"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let tree = env.session.tree();
        let describe = |id: &NodeId| tree.path_of(id).unwrap_or_else(|_| id.to_string());
        let rows = env
            .session
            .windows()
            .iter()
            .map(|(id, kind)| {
                let (label, target) = match kind {
                    WindowKind::FolderView { folder } => ("folder", describe(folder)),
                    WindowKind::FileView { file } => ("file", describe(file)),
                    WindowKind::App { name } => ("app", name.clone()),
                };
                vec![id.0.to_string(), label.to_string(), target]
            })
            .collect();
        Ok(CommandOutput::Table {
            headers: vec!["Id".into(), "Kind".into(), "Target".into()],
            rows,
        })
    }
}

struct CloseCmd;
impl Command for CloseCmd {
    fn name(&self) -> &str {
        "close"
    }
    fn description(&self) -> &str {
        "Close a window by number"
    }
    fn usage(&self) -> &str {
        "close <id>"
    }
    fn category(&self) -> &str {
        "windows"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let raw = args.first().ok_or_else(|| usage_error(self))?;
        let id = raw
            .parse::<u64>()
            .map(berry_vfs::WindowId)
            .map_err(|_| BerryError::Command(format!("not a window id: {raw}")))?;
        if id == env.window {
            return Err(BerryError::Command(
                "cannot close the shell's own window".to_string(),
            ));
        }
        match env.session.close_window(id) {
            Some(_) => Ok(CommandOutput::None),
            None => Err(BerryError::Command(format!("no such window: {raw}"))),
        }
    }
}

struct SaveCmd;
impl Command for SaveCmd {
    fn name(&self) -> &str {
        "save"
    }
    fn description(&self) -> &str {
        "Write pending changes to storage now"
    }
    fn usage(&self) -> &str {
        "save"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let msg = if env.session.flush() {
            "Saved"
        } else {
            "Nothing to save"
        };
        Ok(CommandOutput::Text(msg.to_string()))
    }
}

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        "Save and leave the shell"
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Exit)
    }
}
