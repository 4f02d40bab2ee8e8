// NULL-terminated `char *` arrays for argv / envp

use std::ffi::CString;
use std::marker::PhantomData;

/// Borrowed view of C strings as a NULL-terminated pointer array
///
/// Holds exactly `len + 1` slots; the last one is the sentinel.
pub(crate) struct CStringArray<'a> {
    ptrs: Vec<*mut libc::c_char>,
    _strings: PhantomData<&'a [CString]>,
}

impl<'a> CStringArray<'a> {
    pub(crate) fn new(strings: &'a [CString]) -> Self {
        let mut ptrs = Vec::with_capacity(strings.len() + 1);
        ptrs.extend(strings.iter().map(|s| s.as_ptr() as *mut libc::c_char));
        ptrs.push(std::ptr::null_mut());
        Self {
            ptrs,
            _strings: PhantomData,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }

    #[cfg(test)]
    fn slots(&self) -> usize {
        self.ptrs.len()
    }
}
