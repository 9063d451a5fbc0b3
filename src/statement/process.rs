//! Process management primitives: find, kill, and detach.
//!
//! `find_pid` and `forget` are calls into library functions (see
//! [`crate::functions`]); only `kill` renders inline.

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::functions::LibraryFunction;
use crate::token::ShellToken;
use crate::utils::replace_tokens;

fn quoted(arg: &str, family: OsFamily) -> Result<String, RenderError> {
    Ok(format!("\"{}\"", replace_tokens(arg, family)?))
}

fn render_library_call(
    function: LibraryFunction,
    args: &[&str],
    family: OsFamily,
) -> Result<String, RenderError> {
    let mut rendered = match family {
        OsFamily::Unix => function.name().to_owned(),
        OsFamily::Windows => format!("call :{}", function.name()),
    };
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&quoted(arg, family)?);
    }
    rendered.push_str(ShellToken::Lf.to(family));
    Ok(rendered)
}

pub(super) fn render_find_pid(pattern: &str, family: OsFamily) -> Result<String, RenderError> {
    render_library_call(LibraryFunction::FindPid, &[pattern], family)
}

pub(super) fn render_forget(
    instance_name: &str,
    script: &str,
    log_dir: &str,
    family: OsFamily,
) -> Result<String, RenderError> {
    render_library_call(
        LibraryFunction::Forget,
        &[instance_name, script, log_dir],
        family,
    )
}

// The shell defers a trapped TERM until its foreground child exits, so the
// children are signalled after the shell itself; the trap then records 143.
pub(super) fn render_kill(family: OsFamily) -> String {
    match family {
        OsFamily::Unix => String::from(concat!(
            "[ -n \"$FOUND_PID\" ] && {\n",
            "   echo stopping $FOUND_PID\n",
            "   kill $FOUND_PID\n",
            "   for CHILD_PID in `ps -eo pid=,ppid= | awk -v parent=\"$FOUND_PID\" '$2 == parent {print $1}'`; do\n",
            "      kill $CHILD_PID 2>/dev/null\n",
            "   done\n",
            "}\n",
        )),
        OsFamily::Windows => String::from(concat!(
            "if defined FOUND_PID (\r\n",
            "   echo stopping %FOUND_PID%\r\n",
            "   taskkill /F /T /PID %FOUND_PID% >NUL\r\n",
            ")\r\n",
        )),
    }
}
