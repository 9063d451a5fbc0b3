//! Shared shell functions and the dependency graph that decides which of them
//! a script embeds.
//!
//! Statements only name the functions they call. At build time the names are
//! resolved once: names defined by the script itself (environment scopes) are
//! satisfied locally, library names pull in their own dependencies, and
//! anything else is an error.

use std::collections::BTreeSet;

use crate::error::RenderError;
use crate::family::OsFamily;

/// A function shipped with every script that needs it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LibraryFunction {
    /// Prints a message to stderr and exits.
    Abort,
    /// Resolves a process by pattern into `FOUND_PID`.
    FindPid,
    /// Starts a script in the background with logs redirected.
    Forget,
}

impl LibraryFunction {
    /// Every library function.
    pub const ALL: [Self; 3] = [Self::Abort, Self::FindPid, Self::Forget];

    /// Function name as called from scripts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::FindPid => "findPid",
            Self::Forget => "forget",
        }
    }

    /// Looks up a library function by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|function| function.name() == name)
    }

    /// Functions this one calls.
    #[must_use]
    pub const fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Abort => &[],
            Self::FindPid => &[Self::Abort],
            Self::Forget => &[Self::Abort, Self::FindPid],
        }
    }

    /// Complete definition for `family`.
    #[must_use]
    pub const fn definition(self, family: OsFamily) -> &'static str {
        match (self, family) {
            (Self::Abort, OsFamily::Unix) => UNIX_ABORT,
            (Self::Abort, OsFamily::Windows) => WINDOWS_ABORT,
            (Self::FindPid, OsFamily::Unix) => UNIX_FIND_PID,
            (Self::FindPid, OsFamily::Windows) => WINDOWS_FIND_PID,
            (Self::Forget, OsFamily::Unix) => UNIX_FORGET,
            (Self::Forget, OsFamily::Windows) => WINDOWS_FORGET,
        }
    }
}

/// Resolves `required` function names into the library functions to embed.
///
/// Names listed in `defined` are provided by the script itself. The result
/// is deduplicated, closed under [`LibraryFunction::dependencies`], and
/// ordered by [`LibraryFunction`]'s declaration order.
///
/// # Errors
///
/// Returns [`RenderError::UnknownFunction`] for a name that is neither
/// defined nor a library function.
pub fn resolve_library_functions<'a, I>(
    required: I,
    defined: &[String],
    family: OsFamily,
) -> Result<BTreeSet<LibraryFunction>, RenderError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut resolved = BTreeSet::new();
    let mut pending: Vec<LibraryFunction> = Vec::new();

    for name in required {
        if defined.iter().any(|local| local == name) {
            continue;
        }
        let function =
            LibraryFunction::from_name(name).ok_or_else(|| RenderError::UnknownFunction {
                name: name.to_owned(),
                family,
            })?;
        pending.push(function);
    }

    while let Some(function) = pending.pop() {
        if resolved.insert(function) {
            pending.extend_from_slice(function.dependencies());
        }
    }

    Ok(resolved)
}

/// Concatenates the definitions of `functions` for `family`.
#[must_use]
pub fn write_library_functions(functions: &BTreeSet<LibraryFunction>, family: OsFamily) -> String {
    functions
        .iter()
        .map(|function| function.definition(family))
        .collect()
}

const UNIX_ABORT: &str = "\
abort() {
   echo \"aborting: $@\" 1>&2
   exit 1
}
";

const UNIX_FIND_PID: &str = "\
findPid() {
   unset FOUND_PID
   [ $# -eq 1 ] || {
      abort \"findPid requires a parameter of pattern to match\"
      return 1
   }
   PATTERN=\"$1\"
   _FOUND=`ps auxwww|grep \"$PATTERN\"|grep -v \" $0\"|grep -v grep|awk -v self=$$ '$2 != self {print $2}'|head -1`
   [ -n \"$_FOUND\" ] && {
      export FOUND_PID=$_FOUND
      return 0
   }
   return 1
}
";

const UNIX_FORGET: &str = "\
forget() {
   unset FOUND_PID
   [ $# -eq 3 ] || {
      abort \"forget requires parameters INSTANCE_NAME SCRIPT LOG_DIR\"
      return 1
   }
   INSTANCE_NAME=\"$1\"
   SCRIPT=\"$2\"
   LOG_DIR=\"$3\"
   mkdir -p \"$LOG_DIR\"
   findPid \"$INSTANCE_NAME\"
   [ -n \"$FOUND_PID\" ] && {
      echo \"$INSTANCE_NAME already running pid $FOUND_PID\"
      return 1
   }
   nohup \"$SCRIPT\" >\"$LOG_DIR/stdout.log\" 2>\"$LOG_DIR/stderr.log\" &
   RETURN=$?
   # the child may not be visible to findPid yet
   [ $RETURN -eq 0 ] && sleep 1
   return $RETURN
}
";

const WINDOWS_ABORT: &str = "\
:abort\r
   >&2 echo aborting: %~1\r
   exit /b 1\r
";

const WINDOWS_FIND_PID: &str = "\
:findPid\r
   set FOUND_PID=\r
   if \"%~1\" == \"\" (\r
      call :abort \"findPid requires a parameter of pattern to match\"\r
      exit /b 1\r
   )\r
   for /f \"usebackq tokens=2\" %%a in (`tasklist /NH /FI \"WINDOWTITLE eq %~1\" ^| find /V \"INFO:\"`) do set FOUND_PID=%%a\r
   if defined FOUND_PID exit /b 0\r
   exit /b 1\r
";

const WINDOWS_FORGET: &str = "\
:forget\r
   set FOUND_PID=\r
   if \"%~3\" == \"\" (\r
      call :abort \"forget requires parameters INSTANCE_NAME SCRIPT LOG_DIR\"\r
      exit /b 1\r
   )\r
   if not exist \"%~3\" md \"%~3\"\r
   call :findPid \"%~1\"\r
   if defined FOUND_PID (\r
      echo %~1 already running pid %FOUND_PID%\r
      exit /b 1\r
   )\r
   start \"%~1\" /MIN cmd /c \"\"%~2\" >\"%~3\\stdout.log\" 2>\"%~3\\stderr.log\"\"\r
   exit /b 0\r
";
